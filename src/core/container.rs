use crate::core::foundation::{Capability, Component, Lifecycle, Registrable};
use crate::utils::error::{Result, ScaffoldError};
use std::collections::BTreeMap;
use std::fmt;

pub const DEFAULT_SLOT: &str = "things";

type Factory = Box<dyn FnOnce() -> Result<Box<dyn Component>>>;

/// A pending registration: a key, the capability it claims and a deferred
/// constructor. The constructor only runs once the capability is accepted.
pub struct Registration {
    key: String,
    capability: Option<Capability>,
    factory: Factory,
}

impl Registration {
    pub fn of<T: Registrable>(opts: T::Options) -> Self {
        let key = T::registry_key(&opts);
        Self {
            key,
            capability: Some(T::CAPABILITY),
            factory: Box::new(move || {
                T::construct(opts).map(|thing| Box::new(thing) as Box<dyn Component>)
            }),
        }
    }

    /// Registration for a component built elsewhere, e.g. by a plugin.
    pub fn new<F>(key: impl Into<String>, capability: Option<Capability>, factory: F) -> Self
    where
        F: FnOnce() -> Result<Box<dyn Component>> + 'static,
    {
        Self {
            key: key.into(),
            capability,
            factory: Box::new(factory),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn capability(&self) -> Option<Capability> {
        self.capability
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("key", &self.key)
            .field("capability", &self.capability)
            .finish_non_exhaustive()
    }
}

struct Entry {
    capability: Capability,
    component: Box<dyn Component>,
}

/// Owns at most one instance per key. The storage slot is private; the only
/// way in is `register`.
pub struct Container {
    slot: String,
    entries: BTreeMap<String, Entry>,
}

#[derive(Debug, Clone)]
pub struct ContainerOptions {
    pub slot: String,
}

impl Default for ContainerOptions {
    fn default() -> Self {
        Self {
            slot: DEFAULT_SLOT.to_string(),
        }
    }
}

impl Container {
    pub fn new(slot: impl Into<String>) -> Self {
        Self {
            slot: slot.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Name of the slot this container keeps its instances in.
    pub fn slot(&self) -> &str {
        &self.slot
    }

    pub fn register<T: Registrable>(&mut self, opts: T::Options) -> Result<&mut T> {
        let key = self.register_entry(Registration::of::<T>(opts))?;
        self.get_mut::<T>(&key)
            .ok_or_else(|| ScaffoldError::RegistrationError {
                key,
                reason: "registered instance has an unexpected type".to_string(),
            })
    }

    /// Checks the capability tag, constructs the instance and stores it.
    /// A key that is already taken is overwritten.
    pub fn register_entry(&mut self, registration: Registration) -> Result<String> {
        let Registration {
            key,
            capability,
            factory,
        } = registration;

        let capability = match capability {
            Some(capability) if Capability::admits(Some(capability)) => capability,
            _ => {
                tracing::error!(
                    "'{}' is not a Service, Provider or Container; skipping registration in '{}'",
                    key,
                    self.slot
                );
                return Err(ScaffoldError::RegistrationError {
                    key,
                    reason: "not a Service, Provider or Container".to_string(),
                });
            }
        };

        let component = factory()?;

        if self.entries.contains_key(&key) {
            tracing::warn!("Replacing existing '{}' in '{}'", key, self.slot);
        } else {
            tracing::debug!("Registered {} '{}' in '{}'", capability, key, self.slot);
        }

        self.entries.insert(
            key.clone(),
            Entry {
                capability,
                component,
            },
        );
        Ok(key)
    }

    pub fn get<T: 'static>(&self, key: &str) -> Option<&T> {
        self.entries
            .get(key)
            .and_then(|entry| entry.component.as_any().downcast_ref::<T>())
    }

    pub fn get_mut<T: 'static>(&mut self, key: &str) -> Option<&mut T> {
        self.entries
            .get_mut(key)
            .and_then(|entry| entry.component.as_any_mut().downcast_mut::<T>())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn capability_of(&self, key: &str) -> Option<Capability> {
        self.entries.get(key).map(|entry| entry.capability)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Boots every instance in key order, stopping at the first failure.
    pub fn boot_all(&mut self) -> Result<()> {
        for (key, entry) in self.entries.iter_mut() {
            tracing::debug!("Booting '{}' in '{}'", key, self.slot);
            entry.component.boot()?;
        }
        Ok(())
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new(DEFAULT_SLOT)
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("slot", &self.slot)
            .field("keys", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Lifecycle for Container {
    fn boot(&mut self) -> Result<()> {
        self.boot_all()
    }
}

impl Registrable for Container {
    type Options = ContainerOptions;

    const CAPABILITY: Capability = Capability::Container;

    fn construct(opts: ContainerOptions) -> Result<Self> {
        Ok(Self::new(opts.slot))
    }
}
