pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::MemoryStore;
#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::{
    Configurator, ConfiguratorOptions, EnvSnapshot, ErrorReporter, ExitReporter, Reporter,
    Validator, WarnReporter,
};
pub use core::{
    Capability, Container, Lifecycle, Model, ModelContainer, ModelDefinition, ModelOptions,
    Registrable, TimestampPolicy,
};
pub use domain::model::{CallOptions, Query, Record, RecordId};
pub use domain::ports::Store;
pub use domain::schema::{PropertySchema, Schema};
pub use utils::error::{Result, ScaffoldError};
