use thiserror::Error;
use url::Url;

/// Input field a validation error refers to. The presentation layer maps
/// this back to an input widget to decide focus; the core carries no UI
/// handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    Url,
    ImportPayload,
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Field::Name => write!(f, "site name"),
            Field::Url => write!(f, "site URL"),
            Field::ImportPayload => write!(f, "import payload"),
        }
    }
}

/// Structured validation failure: what went wrong, and which field it
/// belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} cannot be empty")]
    Empty(Field),

    #[error("{0} is not a valid http(s) address")]
    InvalidUrl(Field),

    #[error("import payload is malformed")]
    MalformedPayload,
}

impl ValidationError {
    /// Field the presentation layer should return focus to.
    pub fn field(&self) -> Field {
        match self {
            Self::Empty(field) | Self::InvalidUrl(field) => *field,
            Self::MalformedPayload => Field::ImportPayload,
        }
    }
}

/// Prepend `https://` when the input carries no explicit scheme.
/// Idempotent; applied before every URL reaches the probe engine.
pub fn normalize_url(url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}

/// Site validity predicate shared by add, edit and import: both fields
/// non-empty after trimming, and the normalized URL must parse.
pub fn validate_site(name: &str, url: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::Empty(Field::Name));
    }
    if url.trim().is_empty() {
        return Err(ValidationError::Empty(Field::Url));
    }
    if Url::parse(&normalize_url(url.trim())).is_err() {
        return Err(ValidationError::InvalidUrl(Field::Url));
    }

    Ok(())
}
