use crate::adapters::memory::MemoryStore;
use crate::core::container::Container;
use crate::core::foundation::{Capability, Lifecycle, Registrable};
use crate::core::model::{Model, ModelOptions};
use crate::domain::ports::Store;
use crate::domain::schema::Schema;
use crate::utils::error::{Result, ScaffoldError};
use crate::utils::validation::{validate_identifier, validate_non_empty_string, Validate};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

pub const MODELS_SLOT: &str = "models";

/// Declarative description of one model.
#[derive(Debug, Clone, Default)]
pub struct ModelDefinition {
    pub name: Option<String>,
    pub resource: String,
    pub schema: Option<Schema>,
    pub table: Option<String>,
    pub relations: Option<Value>,
    /// Anything else; loses to the fields above.
    pub overrides: ModelOptions,
}

impl ModelDefinition {
    pub fn new(resource: impl Into<String>, schema: Schema) -> Self {
        Self {
            resource: resource.into(),
            schema: Some(schema),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn with_relations(mut self, relations: Value) -> Self {
        self.relations = Some(relations);
        self
    }

    pub fn with_overrides(mut self, overrides: ModelOptions) -> Self {
        self.overrides = overrides;
        self
    }

    fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.resource)
    }

    fn into_options(self) -> ModelOptions {
        ModelOptions {
            name: self.name,
            resource: Some(self.resource),
            schema: self.schema,
            table: self.table,
            relations: self.relations,
            ..ModelOptions::default()
        }
        .or(self.overrides)
    }
}

impl Validate for ModelDefinition {
    fn validate(&self) -> Result<()> {
        validate_identifier("resource", &self.resource)?;
        if let Some(name) = &self.name {
            validate_non_empty_string("name", name)?;
        }
        if self.schema.is_none() {
            return Err(ScaffoldError::InvalidConfigValueError {
                field: "schema".to_string(),
                value: self.resource.clone(),
                reason: "a model definition needs a schema".to_string(),
            });
        }
        Ok(())
    }
}

/// Application types that describe their own model.
pub trait ModelClass {
    fn definition() -> ModelDefinition;
}

/// One definition or an ordered batch of them.
#[derive(Debug, Clone, Default)]
pub struct ModelBatch(pub Vec<ModelDefinition>);

impl From<ModelDefinition> for ModelBatch {
    fn from(definition: ModelDefinition) -> Self {
        Self(vec![definition])
    }
}

impl From<Vec<ModelDefinition>> for ModelBatch {
    fn from(definitions: Vec<ModelDefinition>) -> Self {
        Self(definitions)
    }
}

impl<const N: usize> From<[ModelDefinition; N]> for ModelBatch {
    fn from(definitions: [ModelDefinition; N]) -> Self {
        Self(definitions.into())
    }
}

/// A container of models that all share one store.
pub struct ModelContainer {
    models: Container,
    store: Arc<dyn Store>,
}

#[derive(Clone, Default)]
pub struct ModelContainerOptions {
    pub store: Option<Arc<dyn Store>>,
}

impl ModelContainer {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            models: Container::new(MODELS_SLOT),
            store,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Registers each definition against the shared store and returns the
    /// keys that made it in. Definitions that fail validation or
    /// construction are logged and skipped.
    pub fn register(&mut self, models: impl Into<ModelBatch>, opts: ModelOptions) -> Vec<String> {
        let ModelBatch(definitions) = models.into();
        if opts.store.is_some() {
            tracing::warn!("Ignoring caller-supplied store; models share the container's store");
        }

        let mut registered = Vec::with_capacity(definitions.len());
        for definition in definitions {
            if let Err(e) = definition.validate() {
                tracing::error!("Skipping model '{}': {}", definition.label(), e);
                continue;
            }

            let label = definition.label().to_string();
            let options = definition
                .into_options()
                .or(opts.clone())
                .with_store(self.store.clone());

            match self.models.register::<Model>(options) {
                Ok(model) => registered.push(model.name().to_string()),
                Err(e) => tracing::error!("Skipping model '{}': {}", label, e),
            }
        }

        tracing::info!(
            "Registered {} model(s) in '{}'",
            registered.len(),
            self.models.slot()
        );
        registered
    }

    pub fn register_class<M: ModelClass>(&mut self, opts: ModelOptions) -> Option<String> {
        self.register(M::definition(), opts).into_iter().next()
    }

    pub fn model(&self, name: &str) -> Option<&Model> {
        self.models.get::<Model>(name)
    }

    pub fn models(&self) -> &Container {
        &self.models
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

impl Default for ModelContainer {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl fmt::Debug for ModelContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelContainer")
            .field("models", &self.models)
            .finish_non_exhaustive()
    }
}

impl Lifecycle for ModelContainer {
    fn boot(&mut self) -> Result<()> {
        self.models.boot_all()
    }
}

impl Registrable for ModelContainer {
    type Options = ModelContainerOptions;

    const CAPABILITY: Capability = Capability::Container;

    fn construct(opts: ModelContainerOptions) -> Result<Self> {
        Ok(match opts.store {
            Some(store) => Self::new(store),
            None => Self::in_memory(),
        })
    }
}
