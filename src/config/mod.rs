//! Configuration loading and management.
//!
//! - [`types`]: config struct definitions and [`Config::load`]
//! - [`defaults`]: serde default functions
//! - [`validation`]: startup checks that collect every problem at once

pub mod defaults;
mod types;
pub mod validation;

pub use types::{
    ChatConfig, Config, ConfigError, IdentityConfig, MetricsConfig, RendezvousConfig,
    SessionConfig,
};
