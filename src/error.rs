/// Typed failures the tool surface reports differently from storage errors.
/// Carried inside `anyhow::Error` and recovered with `downcast_ref`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    Validation(String),
    NotFound(String),
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceError::Validation(msg) => write!(f, "Validation error: {}", msg),
            ServiceError::NotFound(what) => write!(f, "Not found: {}", what),
        }
    }
}

impl std::error::Error for ServiceError {}

pub fn validation(msg: impl Into<String>) -> anyhow::Error {
    ServiceError::Validation(msg.into()).into()
}

pub fn not_found(what: impl Into<String>) -> anyhow::Error {
    ServiceError::NotFound(what.into()).into()
}
