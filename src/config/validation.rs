//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use roomlink_proto::CanonicalId;
use thiserror::Error;

/// Smallest frame limit that still fits a typical chat payload.
const MIN_LINE_LEN: usize = 1024;

/// Validation errors for configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("identity.name is required")]
    MissingName,
    #[error("rendezvous.server must be host:port, got '{0}'")]
    InvalidServer(String),
    #[error("rendezvous.bind_host is required")]
    MissingBindHost,
    #[error("session.connect_timeout_ms must be greater than zero")]
    ZeroTimeout,
    #[error("session.max_line_len must be at least 1024, got {0}")]
    LineLenTooSmall(usize),
    #[error("chat.room has no usable characters: '{0}'")]
    BlankRoom(String),
    #[error("metrics.port must be non-zero")]
    ZeroMetricsPort,
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.identity.name.trim().is_empty() {
        errors.push(ValidationError::MissingName);
    }

    let server = &config.rendezvous.server;
    let valid_server = server
        .rsplit_once(':')
        .is_some_and(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok());
    if !valid_server {
        errors.push(ValidationError::InvalidServer(server.clone()));
    }

    if config.rendezvous.bind_host.trim().is_empty() {
        errors.push(ValidationError::MissingBindHost);
    }

    if config.session.connect_timeout_ms == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }
    if config.session.max_line_len < MIN_LINE_LEN {
        errors.push(ValidationError::LineLenTooSmall(config.session.max_line_len));
    }

    if let Some(room) = &config.chat.room
        && CanonicalId::from_room(room).is_blank()
    {
        errors.push(ValidationError::BlankRoom(room.clone()));
    }

    if config.metrics.as_ref().is_some_and(|m| m.port == 0) {
        errors.push(ValidationError::ZeroMetricsPort);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
