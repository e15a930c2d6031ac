//! Structure of a generic template.
//!
//! Analysis happens once per template, independently of the types it gets instantiated with. It
//! finds the placeholder declarations (`type Something generic.Type`), the imports of the
//! `generic` package, the package clause and the build constraint lines, and decides the fate of
//! every token in the output.

use std::io;
use std::ops::Range;
use indexmap::IndexMap;
use crate::error::TemplateError;
use crate::lexer::{self, Token, TokenKind};
use crate::Set;

/// Package the placeholder types are declared from.
pub const GENERIC_PACKAGE: &str = "generic";

const BUILD_PREFIXES: &[&str] = &["// +build", "//go:build"];

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum PlaceholderKind {
    /// `generic.Type`, any type
    Type,
    /// `generic.Number`, numeric types only
    Number,
}

impl PlaceholderKind {
    fn from_selector(name: &str) -> Option<Self> {
        match name {
            "Type" => Some(PlaceholderKind::Type),
            "Number" => Some(PlaceholderKind::Number),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Placeholder {
    pub name: String,
    pub kind: PlaceholderKind,
    /// Location of the name in the declaration.
    pub span: Range<usize>,
}

/// A build constraint line appearing before the package clause.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Marker {
    pub span: Range<usize>,
    pub tags: Vec<String>,
    /// The constraint is one bare tag, as opposed to a combination of terms.
    pub single: bool,
}

impl Marker {
    fn parse(comment: &str, span: Range<usize>) -> Option<Self> {
        let expression = BUILD_PREFIXES
            .iter()
            .find_map(|prefix| comment.strip_prefix(prefix))?;
        if !expression.is_empty() && !expression.starts_with(char::is_whitespace) {
            return None;
        }
        let is_tag_char = |c: char| c.is_alphanumeric() || c == '_' || c == '.';
        let tags = expression
            .split(|c: char| !is_tag_char(c))
            .filter(|tag| !tag.is_empty())
            .map(ToOwned::to_owned)
            .collect::<Vec<_>>();
        let single = tags.len() == 1 && expression.trim().chars().all(is_tag_char);

        Some(Marker { span, tags, single })
    }

    pub fn names(&self, tag: &str) -> bool {
        self.tags.iter().any(|candidate| candidate == tag)
    }
}

/// What happens to a token when the template is instantiated.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) enum Role {
    Keep,
    /// Part of a placeholder declaration or a generic import.
    Drop,
    /// Part of a build constraint line, `single` ones are removed unless a tag is requested.
    Marker { single: bool },
    /// Blank line separating a removable marker from the rest.
    MarkerGap,
    /// Name in the package clause.
    PackageName,
}

enum Group {
    None,
    Type { open: usize, kept: bool },
    Import { open: usize, kept: bool },
}

#[derive(Debug)]
pub struct Template {
    name: String,
    source: String,
    tokens: Vec<Token>,
    roles: Vec<Role>,
    placeholders: IndexMap<String, Placeholder>,
    package: Option<usize>,
    markers: Vec<Marker>,
    body_start: usize,
}

impl Template {
    pub fn parse<N: Into<String>, S: Into<String>>(name: N, source: S) -> Result<Self, TemplateError> {
        let name = name.into();
        let source = source.into();

        if source.trim().is_empty() {
            return Err(TemplateError::invalid(name, "template is empty"));
        }
        let tokens = match lexer::tokenize(&source) {
            Ok(tokens) => tokens,
            Err(error) => return Err(TemplateError::InvalidTemplate {
                template: name,
                reason: error.to_string(),
                span: Some(error.span),
            }),
        };

        Analysis::new(name, source, tokens).run()
    }

    /// Reads the whole template from `reader`.
    pub fn read<N: Into<String>, R: io::Read>(name: N, mut reader: R) -> Result<Self, TemplateError> {
        let name = name.into();
        let mut bytes = Vec::new();
        if let Err(error) = reader.read_to_end(&mut bytes) {
            return Err(TemplateError::unreadable(name, &error));
        }
        match String::from_utf8(bytes) {
            Ok(source) => Template::parse(name, source),
            Err(error) => {
                let reason = format!("not valid UTF-8: {}", error.utf8_error());
                Err(TemplateError::invalid(name, reason))
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Declared placeholders in declaration order.
    pub fn placeholders(&self) -> impl Iterator<Item=&Placeholder> {
        self.placeholders.values()
    }

    pub fn placeholder(&self, name: &str) -> Option<&Placeholder> {
        self.placeholders.get(name)
    }

    pub fn package_name(&self) -> Option<&str> {
        self.package.map(|index| self.tokens[index].text(&self.source))
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    /// Whether some build constraint line of the template names `tag`.
    pub fn is_tagged(&self, tag: &str) -> bool {
        self.markers.iter().any(|marker| marker.names(tag))
    }

    pub(crate) fn tokens(&self) -> impl Iterator<Item=(&Token, Role)> {
        self.tokens.iter().zip(self.roles.iter().copied())
    }

    /// Tokens after the package clause and imports, repeated for every extra instantiation.
    pub(crate) fn body_tokens(&self) -> impl Iterator<Item=(&Token, Role)> {
        self.tokens().skip(self.body_start)
    }
}

struct Analysis {
    name: String,
    source: String,
    tokens: Vec<Token>,
    roles: Vec<Role>,
    lines: Vec<Range<usize>>,
    placeholders: IndexMap<String, Placeholder>,
    qualifiers: Set<String>,
    package: Option<usize>,
    markers: Vec<Marker>,
    body_start: usize,
}

impl Analysis {
    fn new(name: String, source: String, tokens: Vec<Token>) -> Self {
        let mut lines = Vec::new();
        let mut start = 0;
        for (index, token) in tokens.iter().enumerate() {
            if token.kind == TokenKind::Newline {
                lines.push(start..(index + 1));
                start = index + 1;
            }
        }
        if start < tokens.len() {
            lines.push(start..tokens.len());
        }

        let mut qualifiers = Set::new();
        qualifiers.insert(GENERIC_PACKAGE.to_owned());

        Analysis {
            name,
            source,
            roles: vec![Role::Keep; tokens.len()],
            tokens,
            lines,
            placeholders: IndexMap::new(),
            qualifiers,
            package: None,
            markers: Vec::new(),
            body_start: 0,
        }
    }

    fn run(mut self) -> Result<Template, TemplateError> {
        let mut depth = 0usize;
        let mut group = Group::None;
        let mut comments = Vec::new();
        // Whether every marker of the block ending on the previous line is removable.
        let mut removable_markers = None;

        for line in 0..self.lines.len() {
            let significant = self.significant(line);
            let texts = significant.iter().map(|&index| self.text(index)).collect::<Vec<_>>();
            let texts = texts.as_slice();
            let is_comment = significant.is_empty() && self.has_comment(line);
            let mut marker_block = None;

            if depth == 0 {
                match group {
                    Group::Type { open, kept } => {
                        if texts == [")"] {
                            if !kept {
                                self.drop_lines(open..(line + 1));
                            }
                            group = Group::None;
                        } else if self.declare(&significant)? {
                            self.drop_declaration(line, &comments);
                        } else if !significant.is_empty() {
                            group = Group::Type { open, kept: true };
                        }
                    },
                    Group::Import { open, kept } => {
                        if texts == [")"] {
                            if !kept {
                                self.drop_lines(open..(line + 1));
                            }
                            group = Group::None;
                            self.body_start = self.lines[line].end;
                        } else if self.generic_import(&significant) {
                            self.drop_declaration(line, &comments);
                        } else if !significant.is_empty() {
                            group = Group::Import { open, kept: true };
                        }
                    },
                    Group::None => match texts {
                        [] if is_comment && self.package.is_none() => {
                            if let Some(single) = self.marker(line) {
                                marker_block = Some(single && removable_markers.unwrap_or(true));
                            }
                        },
                        [] if removable_markers == Some(true) => {
                            self.set_role(self.lines[line].clone(), Role::MarkerGap);
                        },
                        ["package", _] if self.package.is_none() => {
                            self.package = Some(significant[1]);
                            self.roles[significant[1]] = Role::PackageName;
                            self.body_start = self.lines[line].end;
                        },
                        ["import", "("] => group = Group::Import { open: line, kept: false },
                        ["import", ..] => {
                            if self.generic_import(&significant[1..]) {
                                self.drop_declaration(line, &comments);
                            }
                            self.body_start = self.lines[line].end;
                        },
                        ["type", "("] => group = Group::Type { open: line, kept: false },
                        ["type", ..] => {
                            if self.declare(&significant[1..])? {
                                self.drop_declaration(line, &comments);
                            }
                        },
                        _ => (),
                    },
                }
            }

            depth = self.track_depth(&significant, depth);
            removable_markers = marker_block;
            if is_comment {
                comments.push(line);
            } else {
                comments.clear();
            }
        }

        Ok(Template {
            name: self.name,
            source: self.source,
            tokens: self.tokens,
            roles: self.roles,
            placeholders: self.placeholders,
            package: self.package,
            markers: self.markers,
            body_start: self.body_start,
        })
    }

    fn text(&self, index: usize) -> &str {
        self.tokens[index].text(&self.source)
    }

    fn significant(&self, line: usize) -> Vec<usize> {
        self.lines[line]
            .clone()
            .filter(|&index| !self.tokens[index].kind.is_trivia())
            .collect()
    }

    fn has_comment(&self, line: usize) -> bool {
        self.tokens[self.lines[line].clone()]
            .iter()
            .any(|token| matches!(token.kind, TokenKind::LineComment | TokenKind::BlockComment))
    }

    fn set_role(&mut self, tokens: Range<usize>, role: Role) {
        for slot in &mut self.roles[tokens] {
            *slot = role;
        }
    }

    /// Drops whole lines, and the blank line after them if that would leave two blank lines in a
    /// row.
    fn drop_lines(&mut self, lines: Range<usize>) {
        if let (Some(first), Some(last)) = (self.lines.get(lines.start), self.lines.get(lines.end - 1)) {
            let tokens = first.start..last.end;
            self.set_role(tokens, Role::Drop);
        }

        let next = lines.end;
        if next < self.lines.len() && self.is_blank(next) && !self.is_dropped(next) {
            let previous = (0..lines.start).rev().find(|&line| !self.is_dropped(line));
            if previous.map_or(true, |line| self.is_blank(line)) {
                let tokens = self.lines[next].clone();
                self.set_role(tokens, Role::Drop);
            }
        }
    }

    fn is_blank(&self, line: usize) -> bool {
        self.tokens[self.lines[line].clone()]
            .iter()
            .all(|token| matches!(token.kind, TokenKind::Whitespace | TokenKind::Newline))
    }

    fn is_dropped(&self, line: usize) -> bool {
        self.roles[self.lines[line].clone()].iter().all(|role| *role == Role::Drop)
    }

    /// Drops a declaration line together with the comment lines directly above it.
    fn drop_declaration(&mut self, line: usize, comments: &[usize]) {
        let first = comments.first().copied().unwrap_or(line);
        self.drop_lines(first..(line + 1));
    }

    /// Registers `Name generic.Type`, returns whether the tokens form a placeholder declaration.
    fn declare(&mut self, significant: &[usize]) -> Result<bool, TemplateError> {
        let (name, kind) = match significant {
            &[name, qualifier, dot, selector] => {
                let is_decl = self.tokens[name].kind == TokenKind::Ident
                    && self.qualifiers.contains(self.text(qualifier))
                    && self.text(dot) == ".";
                match PlaceholderKind::from_selector(self.text(selector)) {
                    Some(kind) if is_decl => (name, kind),
                    _ => return Ok(false),
                }
            },
            _ => return Ok(false),
        };

        let span = self.tokens[name].span.clone();
        let placeholder_name = self.text(name).to_owned();
        if self.placeholders.contains_key(&placeholder_name) {
            return Err(TemplateError::InvalidTemplate {
                template: self.name.clone(),
                reason: format!("placeholder {} is declared twice", placeholder_name),
                span: Some(span),
            });
        }
        self.placeholders.insert(placeholder_name.clone(), Placeholder { name: placeholder_name, kind, span });
        Ok(true)
    }

    /// Checks an import spec (`"path"` or `alias "path"`) for the generic package.
    fn generic_import(&mut self, significant: &[usize]) -> bool {
        let (alias, path) = match significant {
            &[path] => (None, path),
            &[alias, path] => (Some(alias), path),
            _ => return false,
        };
        if !matches!(self.tokens[path].kind, TokenKind::String | TokenKind::RawString) {
            return false;
        }
        let quoted = self.text(path);
        let path = &quoted[1..(quoted.len() - 1)];
        if path.rsplit('/').next() != Some(GENERIC_PACKAGE) {
            return false;
        }
        if let Some(alias) = alias {
            let alias = self.text(alias).to_owned();
            if alias != "_" && alias != "." {
                self.qualifiers.insert(alias);
            }
        }
        true
    }

    /// Records a build constraint line, returns whether it is a removable single-tag marker or
    /// `None` when the line is an ordinary comment.
    fn marker(&mut self, line: usize) -> Option<bool> {
        let tokens = self.lines[line].clone();
        let comment = self.tokens[tokens.clone()]
            .iter()
            .find(|token| token.kind == TokenKind::LineComment)
            .map(|token| token.span.clone());
        let marker = match comment.and_then(|span| Marker::parse(&self.source[span.clone()], span)) {
            Some(marker) => marker,
            None => return None,
        };
        let single = marker.single;
        self.set_role(tokens, Role::Marker { single });
        self.markers.push(marker);
        Some(single)
    }

    fn track_depth(&self, significant: &[usize], mut depth: usize) -> usize {
        for &index in significant {
            if self.tokens[index].kind != TokenKind::Punct {
                continue;
            }
            match self.text(index) {
                "{" => depth += 1,
                "}" => depth = depth.saturating_sub(1),
                _ => (),
            }
        }
        depth
    }
}

#[cfg(test)]
mod tests {
    use super::{PlaceholderKind, Role, Template};
    use crate::error::TemplateError;

    const QUEUE: &str = "// +build genny

package queue

import (
\t\"fmt\"

\t\"github.com/cheekybits/genny/generic\"
)

// Something is the element type.
type Something generic.Type

// SomethingQueue is a queue of Somethings.
type SomethingQueue struct {
\titems []Something
}

func (q *SomethingQueue) String() string {
\treturn fmt.Sprint(q.items)
}
";

    fn kept(template: &Template) -> String {
        template
            .tokens()
            .filter(|(_, role)| *role != Role::Drop)
            .map(|(token, _)| token.text(template.source()))
            .collect()
    }

    #[test]
    fn finds_structure() {
        let template = Template::parse("generic_queue.go", QUEUE).unwrap();
        let placeholders = template.placeholders().collect::<Vec<_>>();
        assert_eq!(placeholders.len(), 1);
        assert_eq!(placeholders[0].name, "Something");
        assert_eq!(placeholders[0].kind, PlaceholderKind::Type);
        assert_eq!(&QUEUE[placeholders[0].span.clone()], "Something");
        assert_eq!(template.package_name(), Some("queue"));
        assert!(template.is_tagged("genny"));
        assert!(!template.is_tagged("other"));
        assert_eq!(template.markers().len(), 1);
        assert!(template.markers()[0].single);
    }

    #[test]
    fn drops_declarations_and_generic_import() {
        let template = Template::parse("generic_queue.go", QUEUE).unwrap();
        let kept = kept(&template);
        assert!(!kept.contains("generic"));
        assert!(!kept.contains("element type"));
        assert!(kept.contains("import (\n\t\"fmt\"\n\n)\n"));
        assert!(kept.contains("// SomethingQueue is a queue of Somethings."));
    }

    #[test]
    fn body_starts_after_imports() {
        let template = Template::parse("generic_queue.go", QUEUE).unwrap();
        let body = template
            .body_tokens()
            .map(|(token, _)| token.text(template.source()))
            .collect::<String>();
        assert!(body.starts_with("\n// Something is the element type."));
        assert!(!body.contains("package"));
    }

    #[test]
    fn grouped_declarations() {
        let source = "package maps

import \"github.com/cheekybits/genny/generic\"

type (
\tKeyType   generic.Type
\tValueType generic.Number
)

type KeyTypeValueTypeMap map[KeyType]ValueType
";
        let template = Template::parse("generic_map.go", source).unwrap();
        let names = template.placeholders().map(|p| (p.name.as_str(), p.kind)).collect::<Vec<_>>();
        assert_eq!(names, [("KeyType", PlaceholderKind::Type), ("ValueType", PlaceholderKind::Number)]);
        assert_eq!(kept(&template), "package maps\n\ntype KeyTypeValueTypeMap map[KeyType]ValueType\n");
    }

    #[test]
    fn mixed_group_is_kept() {
        let source = "package p

type (
\tT generic.Type
\tList []T
)
";
        let template = Template::parse("generic_list.go", source).unwrap();
        assert_eq!(kept(&template), "package p\n\ntype (\n\tList []T\n)\n");
    }

    #[test]
    fn aliased_generic_import() {
        let source = "package p

import g \"github.com/cheekybits/genny/generic\"

type T g.Number
";
        let template = Template::parse("generic_p.go", source).unwrap();
        assert_eq!(template.placeholder("T").map(|p| p.kind), Some(PlaceholderKind::Number));
    }

    #[test]
    fn declarations_inside_functions_are_ignored() {
        let source = "package p

func f() {
\ttype T generic.Type
}
";
        let template = Template::parse("p.go", source).unwrap();
        assert_eq!(template.placeholders().count(), 0);
    }

    #[test]
    fn compound_marker() {
        let source = "//go:build linux && !genny\n\npackage p\n";
        let template = Template::parse("p.go", source).unwrap();
        let marker = &template.markers()[0];
        assert!(!marker.single);
        assert_eq!(marker.tags, ["linux", "genny"]);
    }

    #[test]
    fn comment_that_merely_mentions_build_is_not_a_marker() {
        let template = Template::parse("p.go", "// +buildx genny\npackage p\n").unwrap();
        assert!(template.markers().is_empty());
    }

    macro_rules! invalid {
        ($name:ident, $source:expr) => {
            #[test]
            fn $name() {
                match Template::parse("broken.go", $source) {
                    Err(TemplateError::InvalidTemplate { template, .. }) => assert_eq!(template, "broken.go"),
                    other => panic!("unexpected result {:?}", other),
                }
            }
        }
    }

    invalid!(empty, "");
    invalid!(blank, " \n\t\n");
    invalid!(unterminated_comment, "package p\n/* oops\n");
    invalid!(duplicate_placeholder, "package p\ntype T generic.Type\ntype T generic.Type\n");

    struct FailingReader;

    impl std::io::Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "device gone"))
        }
    }

    #[test]
    fn read_failure_is_invalid_template() {
        match Template::read("gone.go", FailingReader) {
            Err(error @ TemplateError::InvalidTemplate { .. }) => {
                assert_eq!(error.template(), "gone.go");
                assert_eq!(error.to_string(), "gone.go: invalid template: failed to read: device gone");
            },
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn read_rejects_invalid_utf8() {
        let bytes: &[u8] = &[b'p', 0xff, 0xfe];
        assert!(matches!(Template::read("bad.go", bytes), Err(TemplateError::InvalidTemplate { .. })));
    }
}
