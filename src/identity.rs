//! Naming of generated files.
//!
//! `generic_queue.go` instantiated with `int` becomes `int_queue.go`: the `generic` word of the
//! file stem is replaced by the aliases of the bound types. Templates without that word get the
//! placeholder names in their stem replaced (`cell_x.go` with `X=int` gives `cell_int.go`) or,
//! failing that, the aliases prepended.

use std::path::{Path, PathBuf};
use crate::template::{Template, GENERIC_PACKAGE};
use crate::types::Assignment;

const WORD_SEP: &str = "_";

/// Derives the path of the generated file from the template's path.
///
/// When `package` is given the file is placed in a sub-directory of that name.
pub fn derive(template_path: &str, template: &Template, assignments: &[Assignment], package: Option<&str>) -> PathBuf {
    let path = Path::new(template_path);
    let stem = path.file_stem().and_then(|stem| stem.to_str()).unwrap_or(template_path);
    let file_name = match path.extension().and_then(|ext| ext.to_str()) {
        Some(extension) => format!("{}.{}", derive_stem(stem, template, assignments), extension),
        None => derive_stem(stem, template, assignments),
    };

    let mut result = path.parent().map(Path::to_path_buf).unwrap_or_default();
    if let Some(package) = package {
        result.push(package);
    }
    result.push(file_name);
    result
}

fn derive_stem(stem: &str, template: &Template, assignments: &[Assignment]) -> String {
    let names = assignments
        .iter()
        .map(|assignment| placeholder_names(template, assignment))
        .collect::<Vec<_>>();
    let fragment = assignments
        .iter()
        .zip(&names)
        .flat_map(|(assignment, names)| names.iter().filter_map(move |name| assignment.get(name)))
        .map(|type_ref| type_ref.file_fragment())
        .filter(|fragment| !fragment.is_empty())
        .collect::<Vec<_>>()
        .join(WORD_SEP);

    let mut words = stem.split(WORD_SEP).map(ToOwned::to_owned).collect::<Vec<_>>();

    if let Some(word) = words.iter_mut().find(|word| word.eq_ignore_ascii_case(GENERIC_PACKAGE)) {
        *word = fragment;
        return join_words(words);
    }

    let mut replaced = false;
    for word in &mut words {
        let placeholder = names
            .iter()
            .flatten()
            .find(|name| name.eq_ignore_ascii_case(word.as_str()));
        if let Some(placeholder) = placeholder {
            *word = assignments
                .iter()
                .filter_map(|assignment| assignment.get(placeholder))
                .map(|type_ref| type_ref.file_fragment())
                .collect::<Vec<_>>()
                .join(WORD_SEP);
            replaced = true;
        }
    }
    if replaced {
        return join_words(words);
    }

    if fragment.is_empty() {
        stem.to_owned()
    } else {
        [fragment.as_str(), stem].join(WORD_SEP)
    }
}

/// Placeholders naming the file: declared ones in declaration order, or every bound one when the
/// template declares none.
fn placeholder_names<'a>(template: &'a Template, assignment: &'a Assignment) -> Vec<&'a str> {
    let declared = template
        .placeholders()
        .map(|placeholder| placeholder.name.as_str())
        .filter(|name| assignment.contains(name))
        .collect::<Vec<_>>();
    if declared.is_empty() {
        assignment.placeholders().collect()
    } else {
        declared
    }
}

fn join_words(words: Vec<String>) -> String {
    words
        .into_iter()
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(WORD_SEP)
}
