//! Expansion of binding specifications into assignments.
//!
//! A specification looks like `Key=int,string Other=alias:float64,NUMBERS`. Every key becomes a
//! placeholder, every comma-separated token a candidate type for it, and the result is the
//! cartesian product of all candidates.

use std::convert::TryFrom;
use indexmap::IndexMap;
use tracing::debug;
use crate::error::SpecError;
use crate::types::{Assignment, TypeRef};

const PAIR_SEP: char = ' ';
const KEY_VALUE_SEP: char = '=';
const VALUES_SEP: char = ',';

/// Name of the symbolic set expanding to [`BUILTINS`].
pub const BUILTINS_SET: &str = "BUILTINS";
/// Name of the symbolic set expanding to [`NUMBERS`].
pub const NUMBERS_SET: &str = "NUMBERS";

pub static BUILTINS: &[&str] = &[
    "bool",
    "byte",
    "complex128",
    "complex64",
    "error",
    "float32",
    "float64",
    "int",
    "int16",
    "int32",
    "int64",
    "int8",
    "rune",
    "string",
    "uint",
    "uint16",
    "uint32",
    "uint64",
    "uint8",
    "uintptr",
];

pub static NUMBERS: &[&str] = &[
    "float32",
    "float64",
    "int",
    "int16",
    "int32",
    "int64",
    "int8",
    "uint",
    "uint16",
    "uint32",
    "uint64",
    "uint8",
];

/// Parsed binding specification: candidate types per placeholder, in declaration order.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TypeSet {
    candidates: IndexMap<String, Vec<TypeRef>>,
}

impl TypeSet {
    pub fn parse(spec: &str) -> Result<Self, SpecError> {
        let mut candidates = IndexMap::new();
        let mut pair_start = 0;

        for pair in spec.split(PAIR_SEP) {
            let pair_span = pair_start..(pair_start + pair.len());
            let value_start = pair_start + pair.find(KEY_VALUE_SEP).map_or(0, |pos| pos + 1);
            pair_start = pair_span.end + PAIR_SEP.len_utf8();

            let mut segments = pair.split(KEY_VALUE_SEP);
            let (key, values) = match (segments.next(), segments.next(), segments.next()) {
                (Some(key), Some(values), None) => (key, values),
                _ => return Err(SpecError::malformed_binding(spec, "Generic=Specific expected", pair_span)),
            };
            if key.is_empty() {
                return Err(SpecError::malformed_binding(spec, "missing placeholder name before '='", pair_span));
            }
            if candidates.contains_key(key) {
                return Err(SpecError::malformed_binding(spec, format!("placeholder {} is bound twice", key), pair_span));
            }

            let mut types = Vec::new();
            let mut token_start = value_start;
            for token in values.split(VALUES_SEP) {
                match token {
                    BUILTINS_SET => types.extend(BUILTINS.iter().copied().map(TypeRef::builtin)),
                    NUMBERS_SET => types.extend(NUMBERS.iter().copied().map(TypeRef::builtin)),
                    _ => types.push(TypeRef::try_from(token).map_err(|error| error.offset(token_start))?),
                }
                token_start += token.len() + VALUES_SEP.len_utf8();
            }
            candidates.insert(key.to_owned(), types);
        }

        Ok(TypeSet { candidates })
    }

    /// Placeholder names in the order they were declared.
    pub fn placeholders(&self) -> impl Iterator<Item=&str> {
        self.candidates.keys().map(String::as_str)
    }

    pub fn candidates(&self, placeholder: &str) -> Option<&[TypeRef]> {
        self.candidates.get(placeholder).map(Vec::as_slice)
    }

    /// Number of assignments [`expand`](Self::expand) produces.
    pub fn combinations(&self) -> usize {
        self.candidates.values().map(Vec::len).product()
    }

    /// Builds the full cartesian product.
    ///
    /// The last declared placeholder varies fastest, so `A=1,2 B=x,y` yields
    /// `(1, x), (1, y), (2, x), (2, y)`.
    pub fn expand(&self) -> Vec<Assignment> {
        let mut assignments = Vec::with_capacity(self.combinations());
        let mut cursors = vec![0; self.candidates.len()];
        if !cursors.is_empty() {
            self.build(0, &mut cursors, &mut assignments);
        }
        debug!(placeholders = self.candidates.len(), assignments = assignments.len(), "expanded type set");
        assignments
    }

    fn build(&self, depth: usize, cursors: &mut [usize], out: &mut Vec<Assignment>) {
        let options = self.candidates.get_index(depth).map_or(0, |(_, types)| types.len());
        for cursor in 0..options {
            cursors[depth] = cursor;
            if depth + 1 < cursors.len() {
                self.build(depth + 1, cursors, out);
            } else {
                out.push(self.materialize(cursors));
            }
        }
    }

    fn materialize(&self, cursors: &[usize]) -> Assignment {
        self.candidates
            .iter()
            .zip(cursors)
            .map(|((name, types), cursor)| (name.as_str(), types[*cursor].clone()))
            .collect()
    }
}

/// Parses `spec` and expands it in one go.
pub fn expand(spec: &str) -> Result<Vec<Assignment>, SpecError> {
    TypeSet::parse(spec).map(|type_set| type_set.expand())
}

#[cfg(test)]
mod tests {
    use super::{expand, TypeSet, BUILTINS, NUMBERS};
    use crate::error::SpecError;

    fn types<'a>(assignment: &'a crate::Assignment, keys: &[&str]) -> Vec<&'a str> {
        keys.iter().map(|key| assignment.get(key).unwrap().ty()).collect()
    }

    #[test]
    fn aliased_product_in_order() {
        let assignments = expand("Person=george:man,woman Animal=rex:dog,cat Place=london,paris").unwrap();
        assert_eq!(assignments.len(), 8);

        assert_eq!(assignments[0].get("Person").unwrap().alias(), "george");
        assert_eq!(assignments[0].get("Animal").unwrap().alias(), "rex");
        assert_eq!(assignments[0].get("Place").unwrap().alias(), "london");

        let keys = ["Person", "Animal", "Place"];
        let expected = [
            ["man", "dog", "london"],
            ["man", "dog", "paris"],
            ["man", "cat", "london"],
            ["man", "cat", "paris"],
            ["woman", "dog", "london"],
            ["woman", "dog", "paris"],
            ["woman", "cat", "london"],
            ["woman", "cat", "paris"],
        ];
        for (assignment, expected) in assignments.iter().zip(&expected) {
            assert_eq!(types(assignment, &keys), expected);
        }
    }

    macro_rules! count {
        ($name:ident, $spec:expr, $count:expr) => {
            #[test]
            fn $name() {
                let type_set = TypeSet::parse($spec).unwrap();
                assert_eq!(type_set.combinations(), $count);
                let assignments = type_set.expand();
                assert_eq!(assignments.len(), $count);
                for (i, a) in assignments.iter().enumerate() {
                    assert!(assignments[(i + 1)..].iter().all(|b| a != b), "duplicate assignment {:?}", a);
                }
            }
        }
    }

    count!(single, "Person=man Animal=dog Place=london", 1);
    count!(cube, "Person=1,2,3,4,5 Animal=1,2,3,4,5 Place=1,2,3,4,5", 125);
    count!(uneven, "Person=1 Animal=1,2,3,4,5 Place=1,2", 10);
    count!(builtins, "T=BUILTINS", BUILTINS.len());
    count!(numbers_mixed, "K=string,NUMBERS V=BUILTINS", (NUMBERS.len() + 1) * BUILTINS.len());

    #[test]
    fn wildcard_types() {
        let assignments = expand("Person=interface{} Animal=interface{} Place=interface{}").unwrap();
        assert_eq!(assignments.len(), 1);
        for key in &["Person", "Animal", "Place"] {
            assert_eq!(assignments[0].get(key).unwrap().ty(), "interface{}");
        }
    }

    #[test]
    fn deterministic() {
        let spec = "A=1,2,3 B=x,y C=p:q,r";
        assert_eq!(expand(spec).unwrap(), expand(spec).unwrap());
    }

    #[test]
    fn declaration_order_kept() {
        let type_set = TypeSet::parse("Zeta=int Alpha=string").unwrap();
        assert_eq!(type_set.placeholders().collect::<Vec<_>>(), ["Zeta", "Alpha"]);
    }

    #[test]
    fn symbolic_sets_expand_in_place() {
        let type_set = TypeSet::parse("T=a,NUMBERS,b").unwrap();
        let candidates = type_set.candidates("T").unwrap();
        assert_eq!(candidates.len(), NUMBERS.len() + 2);
        assert_eq!(candidates[0].ty(), "a");
        assert_eq!(candidates[1].ty(), NUMBERS[0]);
        assert_eq!(candidates.last().unwrap().ty(), "b");
    }

    macro_rules! malformed_binding {
        ($name:ident, $spec:expr, $span:expr) => {
            #[test]
            fn $name() {
                match expand($spec) {
                    Err(SpecError::MalformedBinding { spec, span, .. }) => {
                        assert_eq!(spec, $spec);
                        assert_eq!(span, $span);
                    },
                    other => panic!("unexpected result {:?}", other),
                }
            }
        }
    }

    malformed_binding!(empty_spec, "", 0..0);
    malformed_binding!(missing_value, "Person=man Animal", 11..17);
    malformed_binding!(double_equals, "Person=man=woman", 0..16);
    malformed_binding!(double_space, "A=int  B=string", 6..6);
    malformed_binding!(empty_key, "=int", 0..4);
    malformed_binding!(duplicate_key, "A=int A=string", 6..14);

    #[test]
    fn malformed_type_ref_points_into_spec() {
        let spec = "A=int B=x,a:b:c";
        match expand(spec) {
            Err(SpecError::MalformedTypeRef { token, span }) => {
                assert_eq!(token, "a:b:c");
                assert_eq!(&spec[span], "a:b:c");
            },
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn empty_candidate_rejected() {
        assert!(matches!(expand("A=int,"), Err(SpecError::MalformedTypeRef { .. })));
    }
}
