use thiserror::Error;

/// Errors from rendering a prompt template.
///
/// These indicate a programming error in the caller and should not occur
/// in production.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("unknown template id '{0}'")]
    UnknownTemplate(String),

    #[error("template '{template}' requires field '{field}'")]
    MissingField {
        template: &'static str,
        field: &'static str,
    },
}
