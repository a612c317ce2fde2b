use crate::config::dotenv::{load_dotenv, EnvSnapshot};
use crate::config::reporter::{ExitReporter, Reporter};
use crate::config::validators::Validator;
use crate::core::foundation::{Capability, ConfigHolder, Lifecycle, Registrable, Service};
use crate::utils::error::Result;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Variable naming the running environment (development, test, ...).
pub const APP_ENV_VAR: &str = "NODE_ENV";
pub const DEFAULT_APP_ENV: &str = "development";
pub const DEFAULT_ENV_FILE: &str = ".env";

static UNBOOTED: BTreeMap<String, Value> = BTreeMap::new();

/// Caller-supplied options; unset fields fall back to the defaults.
#[derive(Clone, Default, Deserialize)]
pub struct ConfiguratorOptions {
    #[serde(default)]
    pub file: Option<PathBuf>,
    #[serde(default)]
    pub strict: Option<bool>,
    #[serde(skip)]
    pub reporter: Option<Arc<dyn Reporter>>,
    #[serde(default)]
    pub validators: BTreeMap<String, Validator>,
}

impl ConfiguratorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = Some(strict);
        self
    }

    pub fn with_reporter(mut self, reporter: impl Reporter + 'static) -> Self {
        self.reporter = Some(Arc::new(reporter));
        self
    }

    pub fn validator(mut self, name: impl Into<String>, validator: Validator) -> Self {
        self.validators.insert(name.into(), validator);
        self
    }
}

impl fmt::Debug for ConfiguratorOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfiguratorOptions")
            .field("file", &self.file)
            .field("strict", &self.strict)
            .field("reporter", &self.reporter.as_ref().map(|_| "custom"))
            .field("validators", &self.validators)
            .finish()
    }
}

/// Defaults merged with caller options. `validators` always holds
/// [`APP_ENV_VAR`]; a caller validator of the same name replaces it.
#[derive(Clone)]
pub struct ConfiguratorConfig {
    pub file: PathBuf,
    pub strict: bool,
    /// `None` means the default [`ExitReporter`].
    pub reporter: Option<Arc<dyn Reporter>>,
    pub validators: BTreeMap<String, Validator>,
}

impl ConfiguratorConfig {
    pub fn default_validators() -> BTreeMap<String, Validator> {
        BTreeMap::from([(
            APP_ENV_VAR.to_string(),
            Validator::str().with_default(DEFAULT_APP_ENV),
        )])
    }

    pub fn merged(opts: ConfiguratorOptions) -> Self {
        let mut validators = Self::default_validators();
        validators.extend(opts.validators);

        Self {
            file: opts.file.unwrap_or_else(|| PathBuf::from(DEFAULT_ENV_FILE)),
            strict: opts.strict.unwrap_or(false),
            reporter: opts.reporter,
            validators,
        }
    }
}

impl fmt::Debug for ConfiguratorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfiguratorConfig")
            .field("file", &self.file)
            .field("strict", &self.strict)
            .field("reporter", &self.reporter.as_ref().map(|_| "custom"))
            .field("validators", &self.validators)
            .finish()
    }
}

/// Resolves the application's environment once, at boot, and serves
/// read-only lookups afterwards.
///
/// Construction only merges options; nothing is read until [`Lifecycle::boot`]
/// or [`Configurator::boot_with`].
#[derive(Debug)]
pub struct Configurator {
    config: ConfiguratorConfig,
    resolved: Option<BTreeMap<String, Value>>,
}

impl Configurator {
    pub fn new(opts: ConfiguratorOptions) -> Self {
        Self {
            config: ConfiguratorConfig::merged(opts),
            resolved: None,
        }
    }

    pub fn is_booted(&self) -> bool {
        self.resolved.is_some()
    }

    /// Boots against an already captured environment. Process variables
    /// override the ones from the env file.
    pub fn boot_with(&mut self, env: &EnvSnapshot) -> Result<()> {
        if self.is_booted() {
            tracing::debug!("Configurator already booted, keeping resolved environment");
            return Ok(());
        }

        let mut raw = load_dotenv(&self.config.file)?;
        for (key, value) in env.iter() {
            raw.insert(key.clone(), value.clone());
        }

        let mut resolved = BTreeMap::new();
        if !self.config.strict {
            for (key, value) in &raw {
                resolved.insert(key.clone(), Value::String(value.clone()));
            }
        }

        let mut errors = Vec::new();
        for (name, validator) in &self.config.validators {
            match validator.resolve(name, raw.get(name).map(String::as_str)) {
                Ok(value) => {
                    resolved.insert(name.clone(), value);
                }
                Err(error) => {
                    resolved.remove(name);
                    errors.push(error);
                }
            }
        }

        if !errors.is_empty() {
            tracing::debug!("{} environment variables failed validation", errors.len());
            match &self.config.reporter {
                Some(reporter) => reporter.report(&errors)?,
                None => ExitReporter.report(&errors)?,
            }
        }

        tracing::info!(
            "Environment resolved: {} variables ({} mode)",
            resolved.len(),
            if self.config.strict { "strict" } else { "lenient" }
        );
        self.resolved = Some(resolved);
        Ok(())
    }

    /// Every resolved variable; empty until booted.
    pub fn all(&self) -> &BTreeMap<String, Value> {
        self.resolved.as_ref().unwrap_or(&UNBOOTED)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.resolved.as_ref().and_then(|vars| vars.get(key))
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// The value of [`APP_ENV_VAR`], or the default before boot.
    pub fn environment(&self) -> &str {
        self.get_str(APP_ENV_VAR).unwrap_or(DEFAULT_APP_ENV)
    }
}

impl Lifecycle for Configurator {
    fn boot(&mut self) -> Result<()> {
        self.boot_with(&EnvSnapshot::capture())
    }
}

impl ConfigHolder for Configurator {
    type Config = ConfiguratorConfig;

    fn config(&self) -> &ConfiguratorConfig {
        &self.config
    }
}

impl Service for Configurator {}

impl Registrable for Configurator {
    type Options = ConfiguratorOptions;

    const CAPABILITY: Capability = Capability::Service;

    fn construct(opts: ConfiguratorOptions) -> Result<Self> {
        Ok(Self::new(opts))
    }
}
