use std::iter::FromIterator;
use super::TypeRef;
use crate::Map;

/// Binds placeholder names to concrete types for a single instantiation.
///
/// Read-only once built; build it with `collect()`.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Assignment(Map<String, TypeRef>);

impl Assignment {
    pub fn get(&self, placeholder: &str) -> Option<&TypeRef> {
        self.0.get(placeholder)
    }

    pub fn contains(&self, placeholder: &str) -> bool {
        self.0.contains_key(placeholder)
    }

    pub fn placeholders(&self) -> impl Iterator<Item=&str> {
        self.0.keys().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<(S, TypeRef)> for Assignment {
    fn from_iter<I: IntoIterator<Item=(S, TypeRef)>>(iter: I) -> Self {
        Assignment(iter.into_iter().map(|(name, type_ref)| (name.into(), type_ref)).collect())
    }
}
