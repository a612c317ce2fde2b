pub mod container;
pub mod foundation;
pub mod model;
pub mod model_container;

pub use container::{Container, ContainerOptions, Registration};
pub use foundation::{Capability, Component, ConfigHolder, Lifecycle, Provider, Registrable, Service};
pub use model::{Model, ModelConfig, ModelOptions, TimestampPolicy};
pub use model_container::{ModelBatch, ModelClass, ModelContainer, ModelContainerOptions, ModelDefinition};
