use std::fmt;

use crate::config::ConfigError;
use crate::staff::{PasswordHashError, StaffServiceError};
use crate::telemetry::TelemetryError;

/// Process-level failures surfaced by the binary.
#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Bootstrap(StaffServiceError),
    Hashing(PasswordHashError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Bootstrap(err) => write!(f, "bootstrap admin error: {}", err),
            AppError::Hashing(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Bootstrap(err) => Some(err),
            AppError::Hashing(err) => Some(err),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<StaffServiceError> for AppError {
    fn from(value: StaffServiceError) -> Self {
        Self::Bootstrap(value)
    }
}

impl From<PasswordHashError> for AppError {
    fn from(value: PasswordHashError) -> Self {
        Self::Hashing(value)
    }
}
