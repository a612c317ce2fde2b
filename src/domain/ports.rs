use crate::domain::model::{CallOptions, Query, Record, RecordId};
use crate::domain::schema::Schema;
use crate::utils::error::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Everything a store needs to know to manage one resource.
#[derive(Debug, Clone, PartialEq)]
pub struct MapperDefinition {
    pub resource: String,
    pub schema: Schema,
    pub table: Option<String>,
    pub relations: Option<Value>,
    pub default_adapter: Option<String>,
}

impl MapperDefinition {
    pub fn new(resource: impl Into<String>, schema: Schema) -> Self {
        Self {
            resource: resource.into(),
            schema,
            table: None,
            relations: None,
            default_adapter: None,
        }
    }
}

/// Resource-scoped data mapper the models delegate to.
///
/// Lookups that miss resolve to `None` instead of failing; errors are
/// reserved for calls the store could not carry out.
#[async_trait]
pub trait Store: Send + Sync {
    fn define_mapper(&self, mapper: MapperDefinition) -> Result<()>;

    fn get_mapper(&self, resource: &str) -> Option<MapperDefinition>;

    /// Whether `record` is a record of `resource` known to this store.
    fn is(&self, resource: &str, record: &Record) -> bool;

    fn to_json(&self, resource: &str, records: &[Record], opts: &CallOptions) -> Result<Value>;

    async fn create(&self, resource: &str, props: Record, opts: &CallOptions) -> Result<Record>;

    async fn create_many(
        &self,
        resource: &str,
        records: Vec<Record>,
        opts: &CallOptions,
    ) -> Result<Vec<Record>>;

    async fn find(&self, resource: &str, id: &RecordId, opts: &CallOptions)
        -> Result<Option<Record>>;

    async fn find_all(&self, resource: &str, query: &Query, opts: &CallOptions)
        -> Result<Vec<Record>>;

    /// Resolves even when there was nothing to destroy.
    async fn destroy(&self, resource: &str, id: &RecordId, opts: &CallOptions) -> Result<()>;

    async fn destroy_all(&self, resource: &str, query: &Query, opts: &CallOptions) -> Result<()>;

    async fn update(
        &self,
        resource: &str,
        id: &RecordId,
        props: Record,
        opts: &CallOptions,
    ) -> Result<Option<Record>>;

    async fn update_all(
        &self,
        resource: &str,
        props: Record,
        query: &Query,
        opts: &CallOptions,
    ) -> Result<Vec<Record>>;

    /// Each update carries the primary key of its target. The result lines up
    /// with the input, `None` marking records that were not found.
    async fn update_many(
        &self,
        resource: &str,
        records: Vec<Record>,
        opts: &CallOptions,
    ) -> Result<Vec<Option<Record>>>;

    async fn sum(&self, resource: &str, field: &str, query: &Query, opts: &CallOptions)
        -> Result<f64>;
}
