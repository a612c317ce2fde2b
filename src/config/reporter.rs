use crate::config::validators::EnvVarError;
use crate::utils::error::{Result, ScaffoldError};

/// Decides what happens when environment validation fails during boot.
///
/// Returning `Err` aborts the boot with that error. Returning `Ok(())`
/// lets boot finish, with the failing variables left out of the snapshot.
pub trait Reporter: Send + Sync {
    fn report(&self, errors: &[EnvVarError]) -> Result<()>;
}

impl<F> Reporter for F
where
    F: Fn(&[EnvVarError]) -> Result<()> + Send + Sync,
{
    fn report(&self, errors: &[EnvVarError]) -> Result<()> {
        self(errors)
    }
}

/// Default policy: never start with a broken environment. Logs every
/// failure and terminates the process with status 1.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExitReporter;

impl Reporter for ExitReporter {
    fn report(&self, errors: &[EnvVarError]) -> Result<()> {
        for error in errors {
            tracing::error!("❌ {}", error);
            eprintln!("❌ Invalid environment: {}", error);
        }
        std::process::exit(1);
    }
}

/// Turns validation failures into a recoverable error.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorReporter;

impl Reporter for ErrorReporter {
    fn report(&self, errors: &[EnvVarError]) -> Result<()> {
        Err(ScaffoldError::EnvValidationError {
            errors: errors.to_vec(),
        })
    }
}

/// Logs failures as warnings and carries on.
#[derive(Debug, Clone, Copy, Default)]
pub struct WarnReporter;

impl Reporter for WarnReporter {
    fn report(&self, errors: &[EnvVarError]) -> Result<()> {
        for error in errors {
            tracing::warn!("Ignoring invalid environment variable: {}", error);
        }
        Ok(())
    }
}
