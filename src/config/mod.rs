//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → KvTraceConfig (validated, immutable)
//!     → ClientConfig::build (concrete client topology)
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - `auto` mode picks the topology from the shape of the addresses

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{ClientConfig, ClientMode, KvTraceConfig, LogFormat, LoggingConfig};
pub use validation::{validate_config, ValidationError};
