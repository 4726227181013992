//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize, apply NETWORK / LEDGER_API_URL)
//!     → validation.rs (semantic checks)
//!     → OrchestratorConfig (validated, immutable)
//!     → passed explicitly into the ledger client, planner and scheduler
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; one value per batch run
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::ConfigError;
pub use schema::FeeSchedule;
pub use schema::NetworkKind;
pub use schema::OrchestratorConfig;
pub use schema::PacingConfig;
pub use schema::RetryConfig;
