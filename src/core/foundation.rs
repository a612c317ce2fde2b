//! Capability traits shared by everything a [`Container`](super::container::Container)
//! can hold.
//!
//! A *Service* owns state or behaviour and may need a one-time `boot` step.
//! A *Provider* mediates access to data held elsewhere. A *Container* owns
//! one instance per key of the other two (or of other containers).

use crate::utils::error::Result;
use std::any::Any;
use std::fmt;

/// The capability tag a registration carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Capability {
    Service,
    Provider,
    Container,
}

impl Capability {
    pub const ALL: [Capability; 3] = [
        Capability::Service,
        Capability::Provider,
        Capability::Container,
    ];

    /// Whether a declared tag lets a registration into a container.
    pub fn admits(tag: Option<Capability>) -> bool {
        tag.is_some_and(|tag| Self::ALL.contains(&tag))
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::Service => "Service",
            Capability::Provider => "Provider",
            Capability::Container => "Container",
        };
        f.write_str(name)
    }
}

pub trait Lifecycle {
    fn boot(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Holds a configuration value fixed at construction.
pub trait ConfigHolder {
    type Config;

    fn config(&self) -> &Self::Config;
}

pub trait Service: Lifecycle + ConfigHolder {}

pub trait Provider: ConfigHolder {}

/// Object-safe view of a registered instance.
pub trait Component: Lifecycle + Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Lifecycle + Any + Send + Sync> Component for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A type a container can construct from options and store under a key.
pub trait Registrable: Component + Sized {
    type Options: 'static;

    const CAPABILITY: Capability;

    /// Registry key for an instance built from `opts`; the type's short name
    /// unless the type says otherwise.
    fn registry_key(_opts: &Self::Options) -> String {
        short_type_name::<Self>()
    }

    fn construct(opts: Self::Options) -> Result<Self>;
}

/// `app_scaffold::core::model::Model<X>` becomes `Model`.
pub fn short_type_name<T: ?Sized>() -> String {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Widget;
    struct Generic<T>(T);

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name::<Widget>(), "Widget");
        assert_eq!(short_type_name::<Generic<Widget>>(), "Generic");
        assert_eq!(short_type_name::<u32>(), "u32");
    }

    #[test]
    fn test_capability_admits_only_tagged_registrations() {
        for capability in Capability::ALL {
            assert!(Capability::admits(Some(capability)));
        }
        assert!(!Capability::admits(None));
    }
}
