use std::path::PathBuf;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the library
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error in {}: {message}", file.display())]
    Parse { file: PathBuf, message: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A type expression that `syn` could not read as a Rust type.
    #[error("invalid type expression `{text}`: {message}")]
    InvalidType { text: String, message: String },

    /// A handler parameter without a name. Fatal for its endpoint only.
    #[error(
        "encountered a parameter of type `{type_name}` without a name on route `{route}`; \
         parameters must have a name"
    )]
    UnnamedParameter { route: String, type_name: String },

    #[error("invalid manifest: {0}")]
    Manifest(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(format!("JSON: {}", err))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Serialization(format!("YAML: {}", err))
    }
}

impl From<syn::Error> for Error {
    fn from(err: syn::Error) -> Self {
        Error::Parse {
            file: PathBuf::from("<unknown>"),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const _: () = {
        const fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    };

    #[test]
    fn test_unnamed_parameter_message() {
        let err = Error::UnnamedParameter {
            route: "/todos/{id}".to_string(),
            type_name: "i32".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("`i32`"));
        assert!(message.contains("/todos/{id}"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(std::error::Error::source(&err).is_some());
    }
}
