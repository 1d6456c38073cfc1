use thiserror::Error;

/// Unified error type for version calculation
#[derive(Error, Debug)]
pub enum GitverError {
    #[error("Git operation failed: {0}")]
    Git(#[from] git2::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Repository structure error: {0}")]
    Structural(String),

    #[error("Version parsing error: {0}")]
    Version(String),

    #[error("Invalid regular expression: {0}")]
    Regex(#[from] regex::Error),

    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results in gitver
pub type Result<T> = std::result::Result<T, GitverError>;

impl GitverError {
    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        GitverError::Configuration(msg.into())
    }

    /// Create an error about the shape of the repository (missing branches, untraceable parents)
    pub fn structural(msg: impl Into<String>) -> Self {
        GitverError::Structural(msg.into())
    }

    /// Create a version error with context
    pub fn version(msg: impl Into<String>) -> Self {
        GitverError::Version(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GitverError::config("branch 'feature' has no regex");
        assert_eq!(
            err.to_string(),
            "Configuration error: branch 'feature' has no regex"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: GitverError = io_err.into();
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn test_error_from_regex() {
        let regex_err = regex::Regex::new("(unclosed").unwrap_err();
        let err: GitverError = regex_err.into();
        assert!(err.to_string().starts_with("Invalid regular expression"));
    }

    #[test]
    fn test_error_messages_are_descriptive() {
        let error_pairs = vec![
            (GitverError::config("x"), "Configuration error"),
            (GitverError::structural("x"), "Repository structure error"),
            (GitverError::version("x"), "Version parsing error"),
        ];

        for (err, expected_prefix) in error_pairs {
            let msg = err.to_string();
            assert!(
                msg.starts_with(expected_prefix),
                "Error message should start with '{}', but got '{}'",
                expected_prefix,
                msg
            );
        }
    }
}
