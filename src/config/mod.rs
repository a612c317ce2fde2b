#[cfg(feature = "cli")]
pub mod cli;
pub mod configurator;
pub mod dotenv;
pub mod reporter;
pub mod toml_config;
pub mod validators;

#[cfg(feature = "cli")]
pub use cli::CliConfig;
pub use configurator::{Configurator, ConfiguratorConfig, ConfiguratorOptions};
pub use dotenv::EnvSnapshot;
pub use reporter::{ErrorReporter, ExitReporter, Reporter, WarnReporter};
pub use validators::{EnvVarError, Validator, VarKind};
