//! Lossless tokenizer for Go source.
//!
//! Every byte of the input belongs to exactly one token, so concatenating the token texts gives
//! back the source. Only the distinctions the rewriter needs are made: identifiers, literals,
//! comments, layout and single punctuation characters.

use std::ops::Range;
use logos::Logos;

/// Raw token from logos.
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
enum RawToken {
    #[regex(r"//[^\n]*")]
    LineComment,

    #[regex(r"/\*([^*]|\*+[^*/])*\*+/")]
    BlockComment,

    #[regex(r#""([^"\\\n]|\\.)*""#)]
    String,

    #[regex(r"`[^`]*`")]
    RawString,

    #[regex(r"'([^'\\\n]|\\.)*'")]
    Char,

    #[regex(r"[\p{XID_Start}_]\p{XID_Continue}*")]
    Ident,

    #[regex(r"[0-9][0-9A-Za-z_]*(\.[0-9A-Za-z_]*)?")]
    Number,

    #[token("\n")]
    Newline,

    #[regex(r"[ \t\r\x0C]+")]
    Whitespace,

    #[regex(r"[!#$%&()*+,\-./:;<=>?@\[\\\]^{|}~]")]
    Punct,

    // Prefixes of literals running into the end of input (or line). The closed forms above are
    // always longer, so these only win when the closing delimiter is missing.
    #[regex(r"/\*([^*]|\*+[^*/])*\**")]
    OpenBlockComment,

    #[regex(r#""([^"\\\n]|\\.)*"#)]
    #[regex(r"`[^`]*")]
    OpenString,

    #[regex(r"'([^'\\\n]|\\.)*")]
    OpenChar,
}

impl RawToken {
    fn kind(self) -> Result<TokenKind, &'static str> {
        let kind = match self {
            RawToken::LineComment => TokenKind::LineComment,
            RawToken::BlockComment => TokenKind::BlockComment,
            RawToken::String => TokenKind::String,
            RawToken::RawString => TokenKind::RawString,
            RawToken::Char => TokenKind::Char,
            RawToken::Ident => TokenKind::Ident,
            RawToken::Number => TokenKind::Number,
            RawToken::Newline => TokenKind::Newline,
            RawToken::Whitespace => TokenKind::Whitespace,
            RawToken::Punct => TokenKind::Punct,
            RawToken::OpenBlockComment => return Err("block comment"),
            RawToken::OpenString => return Err("string literal"),
            RawToken::OpenChar => return Err("rune literal"),
        };
        Ok(kind)
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum TokenKind {
    LineComment,
    BlockComment,
    String,
    RawString,
    Char,
    Ident,
    Number,
    Newline,
    Whitespace,
    Punct,
    /// Bytes the scanner doesn't recognise, copied through untouched.
    Unknown,
}

impl TokenKind {
    pub fn is_trivia(self) -> bool {
        matches!(self, TokenKind::Whitespace | TokenKind::Newline | TokenKind::LineComment | TokenKind::BlockComment)
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Range<usize>,
}

impl Token {
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.span.clone()]
    }
}

/// A literal or comment that never got closed.
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
#[error("unterminated {what} starting at byte {}", span.start)]
pub struct LexError {
    pub what: &'static str,
    pub span: Range<usize>,
}

pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    let mut lexer = RawToken::lexer(source);
    let mut tokens = Vec::new();

    while let Some(raw) = lexer.next() {
        let span = lexer.span();
        let kind = match raw.map(RawToken::kind) {
            Ok(Ok(kind)) => kind,
            Ok(Err(what)) => return Err(LexError { what, span }),
            Err(()) => TokenKind::Unknown,
        };
        tokens.push(Token { kind, span });
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::{tokenize, TokenKind::{self, *}};

    fn kinds(source: &str) -> Vec<(TokenKind, &str)> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|token| (token.kind, &source[token.span]))
            .collect()
    }

    macro_rules! test_case {
        ($name:ident, $source:expr $(, $expected:expr)*) => {
            #[test]
            fn $name() {
                assert_eq!(kinds($source), vec![$($expected),*]);
            }
        }
    }

    test_case!(empty, "");
    test_case!(ident, "Something", (Ident, "Something"));
    test_case!(pointer, "*Something", (Punct, "*"), (Ident, "Something"));
    test_case!(selector, "generic.Type", (Ident, "generic"), (Punct, "."), (Ident, "Type"));
    test_case!(negation, "!ok", (Punct, "!"), (Ident, "ok"));
    test_case!(line_comment, "x // Something\n", (Ident, "x"), (Whitespace, " "), (LineComment, "// Something"), (Newline, "\n"));
    test_case!(block_comment, "/* a * b */x", (BlockComment, "/* a * b */"), (Ident, "x"));
    test_case!(string, r#""Something \" here""#, (String, r#""Something \" here""#));
    test_case!(raw_string, "`Something\nelse`", (RawString, "`Something\nelse`"));
    test_case!(rune, r"'\n'", (Char, r"'\n'"));
    test_case!(hex_number, "0x1Fu", (Number, "0x1Fu"));
    test_case!(float_number, "1.5", (Number, "1.5"));
    test_case!(division, "a/b", (Ident, "a"), (Punct, "/"), (Ident, "b"));
    test_case!(unicode_ident, "größe", (Ident, "größe"));

    #[test]
    fn lossless() {
        let source = "package queue\n\n// Queue of Something.\ntype Q struct {\n\titems []Something // \"x\"\n}\n";
        let rebuilt = tokenize(source)
            .unwrap()
            .iter()
            .map(|token| token.text(source))
            .collect::<std::string::String>();
        assert_eq!(rebuilt, source);
    }

    macro_rules! unterminated {
        ($name:ident, $source:expr, $what:expr) => {
            #[test]
            fn $name() {
                assert_eq!(tokenize($source).unwrap_err().what, $what);
            }
        }
    }

    unterminated!(open_block_comment, "x /* never closed", "block comment");
    unterminated!(open_string, "x := \"abc\n", "string literal");
    unterminated!(open_raw_string, "x := `abc", "string literal");
    unterminated!(open_rune, "x := 'a", "rune literal");
}
