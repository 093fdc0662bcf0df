use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::jobs::{JobServiceError, PostcodeError};
use std::fmt;

/// Failure surfaced by the `tradesos-api` commands.
#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Postcode(PostcodeError),
    Jobs(JobServiceError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Postcode(err) => write!(f, "postcode rejected: {}", err),
            AppError::Jobs(err) => write!(f, "job workflow error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Postcode(err) => Some(err),
            AppError::Jobs(err) => Some(err),
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

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<PostcodeError> for AppError {
    fn from(value: PostcodeError) -> Self {
        Self::Postcode(value)
    }
}

impl From<JobServiceError> for AppError {
    fn from(value: JobServiceError) -> Self {
        match value {
            JobServiceError::Postcode(err) => Self::Postcode(err),
            other => Self::Jobs(other),
        }
    }
}
