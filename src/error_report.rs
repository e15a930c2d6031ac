use std::fmt;
use codespan_reporting::diagnostic::{Diagnostic, Label};
use codespan_reporting::files::SimpleFile;
use crate::error::{Error, SpecError, TemplateError};

pub trait IntoDiagnostic: Sized {
    fn into_diagnostic<FileId: Copy>(self, file_id: FileId) -> Diagnostic<FileId>;
}

/// Prints the error against the text it refers to and exits.
///
/// `source` is the binding specification for [`SpecError`]s and the template source for
/// [`TemplateError`]s.
pub trait Report {
    fn report<Name: fmt::Display + Clone, Source: AsRef<str>>(self, name: Name, source: Source) -> !;
}

impl<T: IntoDiagnostic> Report for T {
    fn report<Name: fmt::Display + Clone, Source: AsRef<str>>(self, name: Name, source: Source) -> ! {
        emit(self, name, source);
        std::process::exit(1);
    }
}

/// Prints the error to stderr without exiting.
pub fn emit<T: IntoDiagnostic, Name: fmt::Display + Clone, Source: AsRef<str>>(error: T, name: Name, source: Source) {
    use codespan_reporting::term::termcolor::{StandardStream, ColorChoice};

    let diagnostic = error.into_diagnostic(());
    let file = SimpleFile::new(name, source);
    let mut out = StandardStream::stderr(ColorChoice::Auto);
    if let Err(error) = codespan_reporting::term::emit(&mut out, &Default::default(), &file, &diagnostic) {
        eprintln!("{}: {}", diagnostic.message, error);
    }
}

impl IntoDiagnostic for SpecError {
    fn into_diagnostic<FileId: Copy>(self, file_id: FileId) -> Diagnostic<FileId> {
        match self {
            SpecError::MalformedBinding { message, span, .. } => {
                Diagnostic::error()
                    .with_message("malformed binding specification")
                    .with_labels(vec![Label::primary(file_id, span).with_message(message)])
            },
            SpecError::MalformedTypeRef { token, span } => {
                Diagnostic::error()
                    .with_message(format!("couldn't parse type reference '{}'", token))
                    .with_labels(vec![Label::primary(file_id, span).with_message("expected type or alias:type")])
            },
        }
    }
}

impl IntoDiagnostic for TemplateError {
    fn into_diagnostic<FileId: Copy>(self, file_id: FileId) -> Diagnostic<FileId> {
        match self {
            TemplateError::UnboundPlaceholder { template, placeholder, span } => {
                Diagnostic::error()
                    .with_message(format!("placeholder {} of template {} has no type bound to it", placeholder, template))
                    .with_labels(vec![Label::primary(file_id, span).with_message("declared here")])
                    .with_notes(vec![format!("add {}=<type> to the binding specification", placeholder)])
            },
            TemplateError::InvalidTemplate { template, reason, span: Some(span) } => {
                Diagnostic::error()
                    .with_message(format!("invalid template {}", template))
                    .with_labels(vec![Label::primary(file_id, span).with_message(reason)])
            },
            TemplateError::InvalidTemplate { template, reason, span: None } => {
                Diagnostic::error()
                    .with_message(format!("invalid template {}: {}", template, reason))
            },
        }
    }
}

impl IntoDiagnostic for Error {
    fn into_diagnostic<FileId: Copy>(self, file_id: FileId) -> Diagnostic<FileId> {
        match self {
            Error::Spec(error) => error.into_diagnostic(file_id),
            Error::Template(error) => error.into_diagnostic(file_id),
        }
    }
}
