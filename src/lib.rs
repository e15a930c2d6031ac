//! Instantiation of generic source templates for concrete types.
//!
//! A template is ordinary Go source whose placeholder types are declared as
//! `type Something generic.Type`. [`typeset::expand`] turns a binding specification such as
//! `Something=int,string` into [`Assignment`]s and [`Instantiator`] rewrites the template once per
//! assignment, touching identifiers only.

use std::io;

pub mod types;
pub mod typeset;
pub mod lexer;
pub mod template;
pub mod instantiate;
pub mod identity;
pub mod error;
pub mod error_report;
pub mod manifest;

pub use error::{Error, SpecError, TemplateError};
pub use instantiate::{Generated, Instantiator, GENERATED_HEADER};
pub use template::Template;
pub use types::{Assignment, TypeRef};
pub use typeset::{expand, TypeSet};

pub type Map<K, V> = std::collections::BTreeMap<K, V>;
pub type Set<T> = std::collections::BTreeSet<T>;

/// Reads a template from `source` and instantiates it once per assignment.
///
/// Returns the bytes of the single merged output. `template_name` identifies the template in
/// errors; `output_name`, `package` and `tag` behave as the corresponding [`Instantiator`]
/// settings.
pub fn generics<R: io::Read>(template_name: &str, output_name: Option<&str>, package: Option<&str>, tag: Option<&str>, source: R, assignments: &[Assignment]) -> Result<Vec<u8>, TemplateError> {
    let template = Template::read(template_name, source)?;

    let mut instantiator = Instantiator::new();
    if let Some(output_name) = output_name {
        instantiator = instantiator.output_name(output_name);
    }
    if let Some(package) = package {
        instantiator = instantiator.package(package);
    }
    if let Some(tag) = tag {
        instantiator = instantiator.tag(tag);
    }

    instantiator
        .instantiate(&template, assignments)
        .map(|generated| generated.content)
}

/// Expands `spec` and instantiates the template with all resulting assignments.
pub fn specialize<R: io::Read>(template_name: &str, source: R, spec: &str, instantiator: &Instantiator<'_>) -> Result<Generated, Error> {
    let assignments = expand(spec)?;
    let template = Template::read(template_name, source)?;
    Ok(instantiator.instantiate(&template, &assignments)?)
}
