use std::fmt;

use crate::convert_error;

#[derive(Clone, Copy, Debug, strum::Display, Eq, PartialEq)]
pub enum ErrorKind {
    TokenUnavailable,
    Network,
    Validation,
    Conflict,
    Api,
    MalformedCatalog,
    NotFound,
    Io,
}

impl ErrorKind {
    /// Process exit status for the CLI, so scripts can tell a stale write
    /// from a rejected form.
    pub fn exit_code(&self) -> i32 {
        match self {
            ErrorKind::Validation => 2,
            ErrorKind::TokenUnavailable => 3,
            ErrorKind::Conflict => 4,
            ErrorKind::NotFound => 5,
            ErrorKind::Network => 6,
            ErrorKind::Api | ErrorKind::MalformedCatalog | ErrorKind::Io => 1,
        }
    }
}

#[derive(Clone, Debug)]
pub struct CatalogError {
    pub kind: ErrorKind,
    pub status: Option<u16>,
    pub message: String,
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} ({})", self.message, status),
            None => write!(f, "{}", self.message),
        }
    }
}

impl CatalogError {
    pub fn new<S: AsRef<str>>(kind: ErrorKind, message: S) -> Self {
        Self {
            kind,
            status: None,
            message: message.as_ref().to_string(),
        }
    }

    pub fn validation<S: AsRef<str>>(message: S) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn disabled() -> Self {
        Self::new(ErrorKind::TokenUnavailable, "disabled")
    }

    pub fn malformed<S: AsRef<str>>(message: S) -> Self {
        Self::new(ErrorKind::MalformedCatalog, message)
    }

    /// Builds an error from a non-2xx response. Stale revision markers come back
    /// as 409 or 422 from the contents API.
    pub fn from_status<S: AsRef<str>>(status: u16, message: S) -> Self {
        let kind = match status {
            404 => ErrorKind::NotFound,
            409 | 422 => ErrorKind::Conflict,
            _ => ErrorKind::Api,
        };

        Self {
            kind,
            status: Some(status),
            message: message.as_ref().to_string(),
        }
    }
}

impl std::error::Error for CatalogError {}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            format!("Request timed out: {}", err)
        } else {
            err.to_string()
        };

        Self {
            kind: ErrorKind::Network,
            status: err.status().map(|s| s.as_u16()),
            message,
        }
    }
}

convert_error!(serde_json::Error, ErrorKind::MalformedCatalog);
convert_error!(base64::DecodeError, ErrorKind::MalformedCatalog);
convert_error!(std::string::FromUtf8Error, ErrorKind::MalformedCatalog);
convert_error!(std::io::Error, ErrorKind::Io);

pub trait ErrorExt<T> {
    fn context<S: AsRef<str>>(self, message: S) -> Result<T, CatalogError>;
}

impl<T> ErrorExt<T> for Option<T> {
    fn context<S: AsRef<str>>(self, message: S) -> Result<T, CatalogError> {
        self.ok_or_else(|| CatalogError::malformed(message))
    }
}

impl<T, E: fmt::Display> ErrorExt<T> for Result<T, E> {
    fn context<S: AsRef<str>>(self, message: S) -> Result<T, CatalogError> {
        self.map_err(|e| CatalogError::malformed(format!("{}: {}", message.as_ref(), e)))
    }
}

#[macro_export]
macro_rules! convert_error {
    ($err_type:ty, $kind:expr) => {
        impl From<$err_type> for CatalogError {
            fn from(err: $err_type) -> Self {
                let err_str = err.to_string();

                CatalogError::new($kind, err_str)
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_separate_conflicts_from_bad_input() {
        assert_eq!(CatalogError::from_status(422, "x").kind.exit_code(), 4);
        assert_eq!(CatalogError::validation("x").kind.exit_code(), 2);
        assert_eq!(CatalogError::disabled().kind.exit_code(), 3);
        assert_eq!(CatalogError::malformed("x").kind.exit_code(), 1);
    }

    #[test]
    fn stale_sha_statuses_map_to_conflict() {
        assert_eq!(CatalogError::from_status(409, "x").kind, ErrorKind::Conflict);
        assert_eq!(CatalogError::from_status(422, "x").kind, ErrorKind::Conflict);
        assert_eq!(CatalogError::from_status(404, "x").kind, ErrorKind::NotFound);
        assert_eq!(CatalogError::from_status(500, "x").kind, ErrorKind::Api);
    }

    #[test]
    fn display_includes_status() {
        let err = CatalogError::from_status(409, "sha does not match");

        assert_eq!(err.to_string(), "sha does not match (409)");
        assert_eq!(CatalogError::disabled().to_string(), "disabled");
    }

    #[test]
    fn context_on_missing_value() {
        let err = None::<u8>.context("Missing token field").unwrap_err();

        assert_eq!(err.kind, ErrorKind::MalformedCatalog);
        assert_eq!(err.message, "Missing token field");
    }
}
