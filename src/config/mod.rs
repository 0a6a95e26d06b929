//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! .env file (optional) + process environment
//!     → loader.rs (dotenvy, envy prefixed deserialization)
//!     → validation.rs (semantic checks)
//!     → Settings (validated, immutable)
//!     → passed by reference from main to the subsystems that need it
//! ```
//!
//! # Design Decisions
//! - Loaded once at startup; no global cache
//! - All fields have defaults so an empty environment is a valid config
//! - Real environment variables take precedence over the env file

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_settings, load_settings_with_env_file, settings_from_vars, ConfigError};
pub use schema::{ApiConfig, AppConfig, LogFormat, Settings};
