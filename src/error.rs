use std::io;
use std::ops::Range;

/// Mistakes in a binding specification or a single type token.
///
/// These are caller-input errors, the offending text is always included so the user can find the
/// typo.
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum SpecError {
    #[error("malformed binding specification '{spec}': {message}")]
    MalformedBinding {
        spec: String,
        message: String,
        span: Range<usize>,
    },
    #[error("couldn't parse type reference '{token}'")]
    MalformedTypeRef {
        token: String,
        span: Range<usize>,
    },
}

impl SpecError {
    pub(crate) fn malformed_binding<S: Into<String>>(spec: &str, message: S, span: Range<usize>) -> Self {
        SpecError::MalformedBinding {
            spec: spec.to_owned(),
            message: message.into(),
            span,
        }
    }

    /// Shifts the span of a type reference error so it points into the enclosing specification.
    pub(crate) fn offset(self, by: usize) -> Self {
        match self {
            SpecError::MalformedTypeRef { token, span } => SpecError::MalformedTypeRef {
                token,
                span: (span.start + by)..(span.end + by),
            },
            SpecError::MalformedBinding { spec, message, span } => SpecError::MalformedBinding {
                spec,
                message,
                span: (span.start + by)..(span.end + by),
            },
        }
    }
}

/// Failures tied to one template.
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum TemplateError {
    #[error("{template}: placeholder {placeholder} has no type bound to it")]
    UnboundPlaceholder {
        template: String,
        placeholder: String,
        span: Range<usize>,
    },
    #[error("{template}: invalid template: {reason}")]
    InvalidTemplate {
        template: String,
        reason: String,
        span: Option<Range<usize>>,
    },
}

impl TemplateError {
    pub(crate) fn invalid<T: Into<String>, R: Into<String>>(template: T, reason: R) -> Self {
        TemplateError::InvalidTemplate {
            template: template.into(),
            reason: reason.into(),
            span: None,
        }
    }

    /// Failure to read the template source.
    pub fn unreadable<T: Into<String>>(template: T, error: &io::Error) -> Self {
        TemplateError::invalid(template, format!("failed to read: {}", error))
    }

    pub fn template(&self) -> &str {
        match self {
            TemplateError::UnboundPlaceholder { template, .. } | TemplateError::InvalidTemplate { template, .. } => template,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Spec(#[from] SpecError),
    #[error(transparent)]
    Template(#[from] TemplateError),
}

impl Error {
    pub fn is_spec_error(&self) -> bool {
        matches!(self, Error::Spec(_))
    }

    pub fn is_template_error(&self) -> bool {
        matches!(self, Error::Template(_))
    }
}
