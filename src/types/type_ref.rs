use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;
use crate::error::SpecError;

const ALIAS_SEP: char = ':';

/// Concrete type bound to a placeholder.
///
/// `ty` is the type expression written into the generated source, `alias` is the name used when
/// a placeholder appears inside a longer identifier or in a derived file name.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct TypeRef {
    alias: String,
    ty: String,
}

impl TypeRef {
    pub fn new<A: Into<String>, T: Into<String>>(alias: A, ty: T) -> Result<Self, SpecError> {
        let alias = alias.into();
        let ty = ty.into();
        if alias.is_empty() || ty.is_empty() {
            let token = format!("{}{}{}", alias, ALIAS_SEP, ty);
            let span = 0..token.len();
            return Err(SpecError::MalformedTypeRef { token, span });
        }
        Ok(TypeRef { alias, ty })
    }

    /// Unaliased reference to a type name known to be non-empty.
    pub(crate) fn builtin(name: &str) -> Self {
        TypeRef { alias: name.to_owned(), ty: name.to_owned() }
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn ty(&self) -> &str {
        &self.ty
    }

    /// Identifier-safe form of the alias, usable as a word inside a longer identifier.
    ///
    /// Pointer and reference markers, braces, brackets and package qualifiers are dropped, so
    /// `*pkg.Thing` becomes `pkgThing` and `interface{}` becomes `interface`.
    pub fn ident_fragment(&self) -> String {
        self.alias
            .chars()
            .filter(|c| c.is_alphanumeric() || *c == '_')
            .collect()
    }

    /// Lower-case form of the alias used in file names.
    pub fn file_fragment(&self) -> String {
        self.alias
            .chars()
            .flat_map(char::to_lowercase)
            .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_')
            .collect()
    }
}

impl<'a> TryFrom<&'a str> for TypeRef {
    type Error = SpecError;

    fn try_from(token: &'a str) -> Result<Self, Self::Error> {
        let malformed = || SpecError::MalformedTypeRef {
            token: token.to_owned(),
            span: 0..token.len(),
        };

        let mut parts = token.split(ALIAS_SEP);
        let first = parts.next().unwrap_or_default();
        match (parts.next(), parts.next()) {
            (None, _) => TypeRef::new(first, first).map_err(|_| malformed()),
            (Some(ty), None) => TypeRef::new(first, ty).map_err(|_| malformed()),
            (Some(_), Some(_)) => Err(malformed()),
        }
    }
}

impl FromStr for TypeRef {
    type Err = SpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TypeRef::try_from(s)
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.alias == self.ty {
            write!(f, "{}", self.ty)
        } else {
            write!(f, "{}{}{}", self.alias, ALIAS_SEP, self.ty)
        }
    }
}
