//! Resource-scoped proxy over a [`Store`].
//!
//! A [`Model`] forwards every call to its store under its resource name. On
//! top of that it stamps `created_at`/`updated_at`, checks property names
//! against the schema for `find_where`, `increment` and `decrement`, and
//! validates manual timestamps.

use crate::core::foundation::{Capability, ConfigHolder, Lifecycle, Provider, Registrable};
use crate::domain::model::{
    CallOptions, Query, Record, RecordId, CREATED_AT, PRIMARY_KEY, UPDATED_AT,
};
use crate::domain::ports::{MapperDefinition, Store};
use crate::domain::schema::{PropertyType, Schema};
use crate::utils::error::{Result, ScaffoldError};
use crate::utils::time::{fresh_timestamp, is_valid_iso8601, Timezone};
use crate::utils::validation::validate_identifier;
use serde_json::{Number, Value};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

pub const DEFAULT_ENVIRONMENT: &str = "development";

/// When automatic timestamping runs, by environment name.
///
/// | policy            | `"development"` | `"test"` | `"migration"` |
/// |-------------------|-----------------|----------|---------------|
/// | `Always`          | stamp           | stamp    | stamp         |
/// | `Never`           | skip            | skip     | skip          |
/// | `SkipIn{test, migration}` | stamp   | skip     | skip          |
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TimestampPolicy {
    #[default]
    Always,
    Never,
    SkipIn(BTreeSet<String>),
}

impl TimestampPolicy {
    pub fn skip_in<I, S>(environments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TimestampPolicy::SkipIn(environments.into_iter().map(Into::into).collect())
    }

    pub fn stamps(&self, environment: &str) -> bool {
        match self {
            TimestampPolicy::Always => true,
            TimestampPolicy::Never => false,
            TimestampPolicy::SkipIn(skipped) => !skipped.contains(environment),
        }
    }
}

/// Options a model is built from. Unset fields take the model defaults:
/// strict schema, timestamps on, UTC, `development`, stamp always.
#[derive(Clone, Default)]
pub struct ModelOptions {
    pub store: Option<Arc<dyn Store>>,
    /// Registry key; the resource name when unset.
    pub name: Option<String>,
    pub resource: Option<String>,
    pub schema: Option<Schema>,
    pub table: Option<String>,
    pub relations: Option<Value>,
    pub default_adapter: Option<String>,
    pub strict: Option<bool>,
    pub timestamps: Option<bool>,
    pub timezone: Option<String>,
    pub environment: Option<String>,
    pub timestamp_policy: Option<TimestampPolicy>,
}

impl ModelOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store(mut self, store: Arc<dyn Store>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
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

    pub fn with_default_adapter(mut self, adapter: impl Into<String>) -> Self {
        self.default_adapter = Some(adapter.into());
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = Some(strict);
        self
    }

    pub fn timestamps(mut self, timestamps: bool) -> Self {
        self.timestamps = Some(timestamps);
        self
    }

    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    pub fn with_timestamp_policy(mut self, policy: TimestampPolicy) -> Self {
        self.timestamp_policy = Some(policy);
        self
    }

    /// Fields set here win; the rest come from `base`.
    pub fn or(self, base: ModelOptions) -> ModelOptions {
        ModelOptions {
            store: self.store.or(base.store),
            name: self.name.or(base.name),
            resource: self.resource.or(base.resource),
            schema: self.schema.or(base.schema),
            table: self.table.or(base.table),
            relations: self.relations.or(base.relations),
            default_adapter: self.default_adapter.or(base.default_adapter),
            strict: self.strict.or(base.strict),
            timestamps: self.timestamps.or(base.timestamps),
            timezone: self.timezone.or(base.timezone),
            environment: self.environment.or(base.environment),
            timestamp_policy: self.timestamp_policy.or(base.timestamp_policy),
        }
    }
}

impl fmt::Debug for ModelOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelOptions")
            .field("store", &self.store.as_ref().map(|_| "dyn Store"))
            .field("name", &self.name)
            .field("resource", &self.resource)
            .field("schema", &self.schema)
            .field("table", &self.table)
            .field("default_adapter", &self.default_adapter)
            .field("strict", &self.strict)
            .field("timestamps", &self.timestamps)
            .field("timezone", &self.timezone)
            .field("environment", &self.environment)
            .field("timestamp_policy", &self.timestamp_policy)
            .finish()
    }
}

/// Resolved, immutable model configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub name: String,
    pub resource: String,
    /// Final schema, timestamp properties and strict flag included.
    pub schema: Schema,
    pub table: Option<String>,
    pub relations: Option<Value>,
    pub default_adapter: Option<String>,
    pub strict: bool,
    pub timestamps: bool,
    pub timezone: Timezone,
    pub environment: String,
    pub timestamp_policy: TimestampPolicy,
}

#[derive(Clone)]
pub struct Model {
    config: Arc<ModelConfig>,
    store: Arc<dyn Store>,
}

impl Model {
    pub fn new(opts: ModelOptions) -> Result<Self> {
        let store = opts.store.ok_or_else(|| ScaffoldError::ConfigError {
            message: "a model needs a store".to_string(),
        })?;
        let resource = opts.resource.ok_or_else(|| ScaffoldError::ConfigError {
            message: "a model needs a resource name".to_string(),
        })?;
        validate_identifier("resource", &resource)?;

        let timezone: Timezone = match opts.timezone {
            Some(name) => name.parse()?,
            None => Timezone::utc(),
        };
        let strict = opts.strict.unwrap_or(true);
        let timestamps = opts.timestamps.unwrap_or(true);

        let mut schema = opts.schema.unwrap_or_default();
        if timestamps {
            schema = schema.with_timestamps();
        }
        if strict {
            schema.additional_properties = Some(false);
        }

        let config = ModelConfig {
            name: opts.name.unwrap_or_else(|| resource.clone()),
            resource,
            schema,
            table: opts.table,
            relations: opts.relations,
            default_adapter: opts.default_adapter,
            strict,
            timestamps,
            timezone,
            environment: opts
                .environment
                .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string()),
            timestamp_policy: opts.timestamp_policy.unwrap_or_default(),
        };

        store.define_mapper(MapperDefinition {
            resource: config.resource.clone(),
            schema: config.schema.clone(),
            table: config.table.clone(),
            relations: config.relations.clone(),
            default_adapter: config.default_adapter.clone(),
        })?;

        tracing::debug!(
            "Defined model '{}' for resource '{}' (strict: {}, timestamps: {})",
            config.name,
            config.resource,
            config.strict,
            config.timestamps
        );

        Ok(Self {
            config: Arc::new(config),
            store,
        })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn resource(&self) -> &str {
        &self.config.resource
    }

    pub fn table(&self) -> Option<&str> {
        self.config.table.as_deref()
    }

    pub fn relations(&self) -> Option<&Value> {
        self.config.relations.as_ref()
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// The schema the store holds for this resource, falling back to the
    /// model's own.
    pub fn schema(&self) -> Schema {
        self.store
            .get_mapper(self.resource())
            .map(|mapper| mapper.schema)
            .unwrap_or_else(|| self.config.schema.clone())
    }

    pub fn schema_json(&self) -> Value {
        self.schema().to_value()
    }

    pub async fn create(&self, props: Record, opts: &CallOptions) -> Result<Record> {
        let props = self.stamp_create(props, &self.fresh());
        self.store
            .create(self.resource(), props, &self.call_options(opts))
            .await
    }

    pub async fn create_many(&self, records: Vec<Record>, opts: &CallOptions) -> Result<Vec<Record>> {
        let now = self.fresh();
        let records = records
            .into_iter()
            .map(|record| self.stamp_create(record, &now))
            .collect();
        self.store
            .create_many(self.resource(), records, &self.call_options(opts))
            .await
    }

    pub async fn find(&self, id: impl Into<RecordId>, opts: &CallOptions) -> Result<Option<Record>> {
        self.store
            .find(self.resource(), &id.into(), &self.call_options(opts))
            .await
    }

    pub async fn find_all(&self, query: &Query, opts: &CallOptions) -> Result<Vec<Record>> {
        self.store
            .find_all(self.resource(), query, &self.call_options(opts))
            .await
    }

    /// Records whose `property` equals `value`; `property` must be declared.
    pub async fn find_where(
        &self,
        property: &str,
        value: impl Into<Value>,
        opts: &CallOptions,
    ) -> Result<Vec<Record>> {
        self.require_property(property)?;
        self.find_all(&Query::where_eq(property, value), opts).await
    }

    /// First record matching `property = value`, or a new one built from
    /// `props` with `property` set to `value`.
    pub async fn find_or_create(
        &self,
        property: &str,
        value: impl Into<Value>,
        props: Record,
        opts: &CallOptions,
    ) -> Result<Record> {
        self.require_property(property)?;
        let value = value.into();
        let query = Query::where_eq(property, value.clone()).limit(1);

        if let Some(found) = self.find_all(&query, opts).await?.into_iter().next() {
            return Ok(found);
        }
        self.create(props.with(property, value), opts).await
    }

    pub async fn destroy(&self, id: impl Into<RecordId>, opts: &CallOptions) -> Result<()> {
        self.store
            .destroy(self.resource(), &id.into(), &self.call_options(opts))
            .await
    }

    pub async fn destroy_all(&self, query: &Query, opts: &CallOptions) -> Result<()> {
        self.store
            .destroy_all(self.resource(), query, &self.call_options(opts))
            .await
    }

    pub async fn update(
        &self,
        id: impl Into<RecordId>,
        props: Record,
        opts: &CallOptions,
    ) -> Result<Option<Record>> {
        let props = self.stamp_update(props, &self.fresh());
        self.store
            .update(self.resource(), &id.into(), props, &self.call_options(opts))
            .await
    }

    pub async fn update_all(&self, props: Record, query: &Query, opts: &CallOptions) -> Result<Vec<Record>> {
        let props = self.stamp_update(props, &self.fresh());
        self.store
            .update_all(self.resource(), props, query, &self.call_options(opts))
            .await
    }

    pub async fn update_many(
        &self,
        records: Vec<Record>,
        opts: &CallOptions,
    ) -> Result<Vec<Option<Record>>> {
        let now = self.fresh();
        let records = records
            .into_iter()
            .map(|record| self.stamp_update(record, &now))
            .collect();
        self.store
            .update_many(self.resource(), records, &self.call_options(opts))
            .await
    }

    pub async fn sum(&self, field: &str, query: &Query, opts: &CallOptions) -> Result<f64> {
        self.store
            .sum(self.resource(), field, query, &self.call_options(opts))
            .await
    }

    pub fn to_json(&self, records: &[Record], opts: &CallOptions) -> Result<Value> {
        self.store
            .to_json(self.resource(), records, &self.call_options(opts))
    }

    /// Sets both timestamps to the same fresh instant.
    pub async fn touch(&self, id: impl Into<RecordId>, opts: &CallOptions) -> Result<Option<Record>> {
        let now = self.fresh();
        let props = Record::new()
            .with(CREATED_AT, now.clone())
            .with(UPDATED_AT, now);
        self.write_timestamps(id.into(), props, opts).await
    }

    pub async fn set_created_at(
        &self,
        id: impl Into<RecordId>,
        time: Option<&str>,
        opts: &CallOptions,
    ) -> Result<Option<Record>> {
        self.set_timestamp(CREATED_AT, id.into(), time, opts).await
    }

    pub async fn set_updated_at(
        &self,
        id: impl Into<RecordId>,
        time: Option<&str>,
        opts: &CallOptions,
    ) -> Result<Option<Record>> {
        self.set_timestamp(UPDATED_AT, id.into(), time, opts).await
    }

    /// Adds `amount` to a numeric property. Not atomic: concurrent calls on
    /// the same record can lose updates.
    pub async fn increment(
        &self,
        id: impl Into<RecordId>,
        property: &str,
        amount: f64,
        opts: &CallOptions,
    ) -> Result<Option<Record>> {
        self.shift(id.into(), property, amount, opts).await
    }

    pub async fn decrement(
        &self,
        id: impl Into<RecordId>,
        property: &str,
        amount: f64,
        opts: &CallOptions,
    ) -> Result<Option<Record>> {
        self.shift(id.into(), property, -amount, opts).await
    }

    /// Creates a copy of `record` under a new primary key with fresh timestamps.
    pub async fn duplicate(&self, record: &Record, opts: &CallOptions) -> Result<Record> {
        if !self.store.is(self.resource(), record) {
            return Err(ScaffoldError::NotAnInstanceError {
                resource: self.resource().to_string(),
            });
        }

        let mut copy = record.clone();
        copy.remove(PRIMARY_KEY);
        copy.remove(CREATED_AT);
        copy.remove(UPDATED_AT);
        self.create(copy, opts).await
    }

    async fn shift(
        &self,
        id: RecordId,
        property: &str,
        delta: f64,
        opts: &CallOptions,
    ) -> Result<Option<Record>> {
        self.require_numeric(property)?;

        let Some(record) = self.find(id.clone(), opts).await? else {
            tracing::debug!("{} {} not found, nothing to change", self.resource(), id);
            return Ok(None);
        };

        let value = self.shifted_value(property, record.get(property), delta)?;
        self.update(id, Record::new().with(property, value), opts)
            .await
    }

    fn shifted_value(&self, property: &str, current: Option<&Value>, delta: f64) -> Result<Value> {
        let not_numeric = || ScaffoldError::NotNumericError {
            resource: self.resource().to_string(),
            property: property.to_string(),
        };

        let current = match current {
            None | Some(Value::Null) => Number::from(0),
            Some(Value::Number(n)) => n.clone(),
            Some(_) => return Err(not_numeric()),
        };

        if let Some(base) = current.as_i64() {
            if delta.fract() == 0.0 && delta.abs() < i64::MAX as f64 {
                if let Some(sum) = base.checked_add(delta as i64) {
                    return Ok(Value::from(sum));
                }
            }
        }

        let base = current.as_f64().ok_or_else(not_numeric)?;
        Number::from_f64(base + delta)
            .map(Value::Number)
            .ok_or_else(not_numeric)
    }

    async fn set_timestamp(
        &self,
        field: &str,
        id: RecordId,
        time: Option<&str>,
        opts: &CallOptions,
    ) -> Result<Option<Record>> {
        let time = match time {
            Some(time) if !is_valid_iso8601(time) => {
                return Err(ScaffoldError::InvalidTimestampError {
                    value: time.to_string(),
                });
            }
            Some(time) => time.to_string(),
            None => self.fresh(),
        };
        self.write_timestamps(id, Record::new().with(field, time), opts)
            .await
    }

    /// Writes timestamp fields directly, bypassing the update stamping.
    async fn write_timestamps(&self, id: RecordId, props: Record, opts: &CallOptions) -> Result<Option<Record>> {
        self.store
            .update(self.resource(), &id, props, &self.call_options(opts))
            .await
    }

    fn require_property(&self, property: &str) -> Result<PropertyType> {
        self.schema()
            .property_type(property)
            .ok_or_else(|| ScaffoldError::UnknownPropertyError {
                resource: self.resource().to_string(),
                property: property.to_string(),
            })
    }

    fn require_numeric(&self, property: &str) -> Result<()> {
        if self.require_property(property)?.is_numeric() {
            Ok(())
        } else {
            Err(ScaffoldError::NotNumericError {
                resource: self.resource().to_string(),
                property: property.to_string(),
            })
        }
    }

    fn stamping(&self) -> bool {
        self.config.timestamps && self.config.timestamp_policy.stamps(&self.config.environment)
    }

    fn stamp_create(&self, mut props: Record, now: &str) -> Record {
        if self.stamping() {
            if !props.contains_key(CREATED_AT) {
                props.insert(CREATED_AT, now);
            }
            if !props.contains_key(UPDATED_AT) {
                props.insert(UPDATED_AT, now);
            }
        }
        props
    }

    fn stamp_update(&self, mut props: Record, now: &str) -> Record {
        if self.stamping() {
            props.remove(CREATED_AT);
            props.insert(UPDATED_AT, now);
        }
        props
    }

    fn fresh(&self) -> String {
        fresh_timestamp(&self.config.timezone)
    }

    fn call_options(&self, opts: &CallOptions) -> CallOptions {
        let mut opts = opts.clone();
        if opts.adapter.is_none() {
            opts.adapter = self.config.default_adapter.clone();
        }
        opts
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Lifecycle for Model {}

impl ConfigHolder for Model {
    type Config = ModelConfig;

    fn config(&self) -> &ModelConfig {
        &self.config
    }
}

impl Provider for Model {}

impl Registrable for Model {
    type Options = ModelOptions;

    const CAPABILITY: Capability = Capability::Provider;

    fn registry_key(opts: &ModelOptions) -> String {
        opts.name
            .clone()
            .or_else(|| opts.resource.clone())
            .unwrap_or_else(|| "Model".to_string())
    }

    fn construct(opts: ModelOptions) -> Result<Self> {
        Model::new(opts)
    }
}
