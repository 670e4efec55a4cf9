//! Error types for sondeo.
//!
//! This module defines the error type shared by the survey, profile and
//! analysis services. User-facing messages for lookups and conflicts are in
//! Spanish because they travel unchanged to API clients.

use std::path::PathBuf;
use thiserror::Error;

use crate::sav::SavError;

/// The main error type for sondeo operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Data File Errors ===
    /// The survey data file does not exist.
    #[error("Data file not found: {}", path.display())]
    DataFileNotFound {
        /// Configured path of the data file.
        path: PathBuf,
    },

    /// The survey data file could not be decoded.
    #[error("Error reading data file: {0}")]
    DataFile(SavError),

    // === Survey Errors ===
    /// No variable with this identifier exists in the dataset.
    #[error("Pregunta '{id}' no encontrada")]
    QuestionNotFound {
        /// Requested question identifier.
        id: String,
    },

    /// No category with this id exists.
    #[error("Categoría con ID {id} no encontrada")]
    CategoryNotFound {
        /// Requested category id.
        id: u8,
    },

    // === Profile Errors ===
    /// Another profile already uses this e-mail address.
    #[error("Un usuario con el email '{email}' ya existe")]
    ProfileExists {
        /// The conflicting address.
        email: String,
    },

    /// No profile with this id exists.
    #[error("Usuario con ID {id} no encontrado")]
    ProfileNotFound {
        /// Requested profile id.
        id: i64,
    },

    /// Input failed validation.
    #[error("{message}")]
    Validation {
        /// Description of the problem.
        message: String,
    },

    // === Server Errors ===
    /// The HTTP listener could not be bound.
    #[error("failed to bind {addr}: {source}")]
    ServerBind {
        /// Address that was requested.
        addr: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for sondeo operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl From<SavError> for Error {
    fn from(err: SavError) -> Self {
        match err {
            SavError::FileNotFound { path } => Self::DataFileNotFound { path },
            other => Self::DataFile(other),
        }
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a new validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a question not found error.
    #[must_use]
    pub fn question_not_found(id: impl Into<String>) -> Self {
        Self::QuestionNotFound { id: id.into() }
    }

    /// Create a profile conflict error.
    #[must_use]
    pub fn profile_exists(email: impl Into<String>) -> Self {
        Self::ProfileExists {
            email: email.into(),
        }
    }

    /// Check if this error means the requested resource does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::QuestionNotFound { .. }
                | Self::CategoryNotFound { .. }
                | Self::ProfileNotFound { .. }
        )
    }

    /// Check if this error is a uniqueness conflict.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::ProfileExists { .. })
    }

    /// Check if this error is caused by invalid input.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_not_found_display() {
        let err = Error::question_not_found("Q_999");
        assert_eq!(err.to_string(), "Pregunta 'Q_999' no encontrada");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_profile_messages() {
        let err = Error::profile_exists("ana@example.com");
        assert_eq!(
            err.to_string(),
            "Un usuario con el email 'ana@example.com' ya existe"
        );
        assert!(err.is_conflict());

        let err = Error::ProfileNotFound { id: 7 };
        assert_eq!(err.to_string(), "Usuario con ID 7 no encontrado");
        assert!(err.is_not_found());
        assert!(!err.is_conflict());
    }

    #[test]
    fn test_category_not_found_display() {
        let err = Error::CategoryNotFound { id: 42 };
        assert_eq!(err.to_string(), "Categoría con ID 42 no encontrada");
    }

    #[test]
    fn test_validation_error() {
        let err = Error::validation("el email no es válido");
        assert!(err.is_validation());
        assert_eq!(err.to_string(), "el email no es válido");
    }

    #[test]
    fn test_internal_error() {
        let err = Error::internal("something went wrong");
        assert_eq!(err.to_string(), "internal error: something went wrong");
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_from_sav_file_not_found() {
        let err: Error = SavError::FileNotFound {
            path: PathBuf::from("/data/datos.sav"),
        }
        .into();
        assert!(matches!(err, Error::DataFileNotFound { .. }));
        assert_eq!(err.to_string(), "Data file not found: /data/datos.sav");
    }

    #[test]
    fn test_from_sav_format_error() {
        let err: Error = SavError::invalid_format("bad magic").into();
        assert!(matches!(err, Error::DataFile(_)));
        assert!(err.to_string().starts_with("Error reading data file:"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_rusqlite_error() {
        let result = rusqlite::Connection::open_with_flags(
            "/nonexistent/path/db.sqlite",
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY,
        );
        if let Err(sqlite_err) = result {
            let err: Error = sqlite_err.into();
            assert!(matches!(err, Error::DatabaseQuery(_)));
        }
    }

    #[test]
    fn test_from_json_error() {
        let json_result: std::result::Result<i32, serde_json::Error> =
            serde_json::from_str("not valid json");
        if let Err(json_err) = json_result {
            let err: Error = json_err.into();
            assert!(matches!(err, Error::Json(_)));
        }
    }

    #[test]
    fn test_config_validation_error_display() {
        let err = Error::ConfigValidation {
            message: "port must be greater than 0".to_string(),
        };
        assert!(err.to_string().contains("port"));
    }

    #[test]
    fn test_directory_create_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = Error::DirectoryCreate {
            path: PathBuf::from("/root/forbidden"),
            source: io_err,
        };
        assert!(err.to_string().contains("/root/forbidden"));
    }
}
