//! Rewriting of a template for concrete types.

use std::path::PathBuf;
use tracing::{debug, trace, warn};
use crate::error::TemplateError;
use crate::lexer::{Token, TokenKind};
use crate::template::{Role, Template};
use crate::types::{Assignment, TypeRef};

/// Banner put at the top of generated files by the command line tool.
pub const GENERATED_HEADER: &str = "// Code generated by specialize. DO NOT EDIT.\n\n";

/// Result of instantiating one template.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Generated {
    pub path: PathBuf,
    pub content: Vec<u8>,
}

/// Settings shared by all instantiations of a template.
#[derive(Debug, Clone, Default)]
pub struct Instantiator<'a> {
    output_name: Option<&'a str>,
    package: Option<&'a str>,
    tag: Option<&'a str>,
    header: Option<&'a str>,
}

impl<'a> Instantiator<'a> {
    pub fn new() -> Self {
        Instantiator::default()
    }

    /// Uses `name` as the output path instead of deriving it.
    pub fn output_name(self, name: &'a str) -> Self {
        Instantiator { output_name: Some(name), ..self }
    }

    /// Renames the package of the output and places it in a directory of the same name.
    pub fn package(self, package: &'a str) -> Self {
        Instantiator { package: Some(package), ..self }
    }

    /// Keeps the build constraint lines of the template.
    ///
    /// Without a tag single-tag constraints (`// +build genny`) are removed so the generated code
    /// is always compiled.
    pub fn tag(self, tag: &'a str) -> Self {
        Instantiator { tag: Some(tag), ..self }
    }

    /// Text written verbatim before everything else.
    pub fn header(self, header: &'a str) -> Self {
        Instantiator { header: Some(header), ..self }
    }

    /// Produces one output containing an instantiation for each assignment.
    ///
    /// The first instantiation is complete; the following ones only contribute the code after the
    /// package clause and imports so the output stays a single compilable file.
    pub fn instantiate(&self, template: &Template, assignments: &[Assignment]) -> Result<Generated, TemplateError> {
        if assignments.is_empty() {
            return Err(TemplateError::invalid(template.name(), "no type assignments given"));
        }
        for assignment in assignments {
            check_bound(template, assignment)?;
        }
        if let Some(tag) = self.tag {
            if !template.is_tagged(tag) {
                warn!(template = template.name(), tag, "template has no build constraint naming the tag");
            }
        }

        let mut out = String::with_capacity(template.source().len() * assignments.len());
        if let Some(header) = self.header {
            out.push_str(header);
        }
        for (index, assignment) in assignments.iter().enumerate() {
            let substitution = Substitution::new(assignment);
            if index == 0 {
                self.render(template, template.tokens(), &substitution, &mut out);
            } else {
                let mut body = String::new();
                self.render(template, template.body_tokens(), &substitution, &mut body);
                if !out.ends_with("\n\n") && !body.starts_with('\n') {
                    out.push('\n');
                }
                out.push_str(&body);
            }
        }

        let path = match self.output_name {
            Some(name) => PathBuf::from(name),
            None => crate::identity::derive(template.name(), template, assignments, self.package),
        };
        debug!(template = template.name(), output = %path.display(), assignments = assignments.len(), "instantiated template");

        Ok(Generated {
            path,
            content: out.into_bytes(),
        })
    }

    fn render<'t, I>(&self, template: &'t Template, tokens: I, substitution: &Substitution<'_>, out: &mut String)
    where
        I: Iterator<Item=(&'t Token, Role)>,
    {
        let source = template.source();
        for (token, role) in tokens {
            let text = token.text(source);
            match role {
                Role::Drop => (),
                Role::Marker { single: true } | Role::MarkerGap if self.tag.is_none() => (),
                Role::PackageName => out.push_str(self.package.unwrap_or(text)),
                Role::Keep if token.kind == TokenKind::Ident => substitution.write_ident(text, out),
                Role::Keep | Role::Marker { .. } | Role::MarkerGap => out.push_str(text),
            }
        }
    }
}

fn check_bound(template: &Template, assignment: &Assignment) -> Result<(), TemplateError> {
    match template.placeholders().find(|placeholder| !assignment.contains(&placeholder.name)) {
        Some(placeholder) => Err(TemplateError::UnboundPlaceholder {
            template: template.name().to_owned(),
            placeholder: placeholder.name.clone(),
            span: placeholder.span.clone(),
        }),
        None => Ok(()),
    }
}

/// Identifier rewriting for one assignment.
struct Substitution<'a> {
    assignment: &'a Assignment,
    /// Longest first, so `KeyType` wins over `Key` when both are bound.
    names: Vec<&'a str>,
}

impl<'a> Substitution<'a> {
    fn new(assignment: &'a Assignment) -> Self {
        let mut names = assignment.placeholders().collect::<Vec<_>>();
        names.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        Substitution { assignment, names }
    }

    /// Writes `ident` with placeholders replaced.
    ///
    /// An identifier that is exactly a placeholder becomes the bound type. Otherwise every
    /// placeholder spanning whole words of the identifier (`SomethingQueue`, `newSomething`,
    /// `Cell_X`) is replaced by the identifier form of the alias, keeping the case of the first
    /// letter.
    fn write_ident(&self, ident: &str, out: &mut String) {
        if let Some(type_ref) = self.assignment.get(ident) {
            trace!(ident, ty = type_ref.ty(), "substituted placeholder");
            out.push_str(type_ref.ty());
            return;
        }

        let bounds = word_bounds(ident);
        let mut pos = 0;
        while pos < ident.len() {
            if let Some((len, type_ref)) = self.word_match(ident, pos, &bounds) {
                let word = &ident[pos..(pos + len)];
                push_fragment(word, type_ref, out);
                pos += len;
            } else {
                let next = bounds.iter().copied().find(|&bound| bound > pos).unwrap_or(ident.len());
                out.push_str(&ident[pos..next]);
                pos = next;
            }
        }
    }

    fn word_match(&self, ident: &str, pos: usize, bounds: &[usize]) -> Option<(usize, &'a TypeRef)> {
        let rest = &ident[pos..];
        self.names.iter().find_map(|&name| {
            let end = pos + name.len();
            if rest.len() < name.len() || bounds.binary_search(&end).is_err() {
                return None;
            }
            let word = &rest[..name.len()];
            let matches = word == name || (pos > 0 && word == capitalize(name));
            if matches {
                self.assignment.get(name).map(|type_ref| (name.len(), type_ref))
            } else {
                None
            }
        })
    }
}

fn push_fragment(word: &str, type_ref: &TypeRef, out: &mut String) {
    let fragment = type_ref.ident_fragment();
    let mut chars = fragment.chars();
    let first = match chars.next() {
        Some(first) => first,
        None => {
            out.push_str(word);
            return;
        },
    };
    if word.starts_with(char::is_uppercase) {
        out.extend(first.to_uppercase());
    } else {
        out.extend(first.to_lowercase());
    }
    out.push_str(chars.as_str());
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Byte offsets where words of an identifier start, plus its length.
///
/// Words are separated by underscores and by case changes: `KeyTypeMap` has words `Key`, `Type`,
/// `Map` and `HTTPServer` has `HTTP`, `Server`.
fn word_bounds(ident: &str) -> Vec<usize> {
    let chars = ident.char_indices().collect::<Vec<_>>();
    let mut bounds = vec![0];
    for i in 1..chars.len() {
        let (offset, current) = chars[i];
        let previous = chars[i - 1].1;
        let next = chars.get(i + 1).map(|&(_, c)| c);
        let split = previous == '_'
            || current == '_'
            || (current.is_uppercase() && (previous.is_lowercase() || previous.is_numeric()))
            || (current.is_uppercase() && previous.is_uppercase() && next.map_or(false, char::is_lowercase));
        if split {
            bounds.push(offset);
        }
    }
    if !ident.is_empty() {
        bounds.push(ident.len());
    }
    bounds
}
