use crate::domain::model::{compare_values, CallOptions, Order, Query, Record, RecordId, PRIMARY_KEY};
use crate::domain::ports::{MapperDefinition, Store};
use crate::utils::error::{Result, ScaffoldError};
use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct Table {
    next_id: i64,
    records: BTreeMap<RecordId, Record>,
}

#[derive(Default)]
struct State {
    mappers: HashMap<String, MapperDefinition>,
    tables: HashMap<String, Table>,
}

impl State {
    fn mapper(&self, resource: &str) -> Result<&MapperDefinition> {
        self.mappers.get(resource).ok_or_else(|| unknown_resource(resource))
    }

    fn table(&self, resource: &str) -> Result<&Table> {
        self.tables.get(resource).ok_or_else(|| unknown_resource(resource))
    }

    fn table_mut(&mut self, resource: &str) -> Result<&mut Table> {
        self.tables
            .get_mut(resource)
            .ok_or_else(|| unknown_resource(resource))
    }
}

/// Keeps records in process memory, one table per defined resource.
///
/// Primary keys are assigned from a per-resource counter unless the record
/// brings its own. Strict schemas (`additionalProperties: false`) and
/// `required` lists are enforced on write; schema defaults fill missing
/// properties on create.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, resource: &str) -> usize {
        self.read()
            .ok()
            .and_then(|state| state.tables.get(resource).map(|t| t.records.len()))
            .unwrap_or(0)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>> {
        self.state.read().map_err(|_| ScaffoldError::StoreError {
            message: "memory store lock poisoned".to_string(),
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>> {
        self.state.write().map_err(|_| ScaffoldError::StoreError {
            message: "memory store lock poisoned".to_string(),
        })
    }
}

fn unknown_resource(resource: &str) -> ScaffoldError {
    ScaffoldError::StoreError {
        message: format!("no mapper defined for resource '{}'", resource),
    }
}

fn trace_call(operation: &str, resource: &str, opts: &CallOptions) {
    tracing::debug!(
        "memory store {} on '{}' (adapter: {})",
        operation,
        resource,
        opts.adapter.as_deref().unwrap_or("default")
    );
}

fn check_declared(mapper: &MapperDefinition, props: &Record) -> Result<()> {
    if !mapper.schema.is_strict() {
        return Ok(());
    }
    match props
        .keys()
        .find(|key| key.as_str() != PRIMARY_KEY && !mapper.schema.has_property(key))
    {
        Some(key) => Err(ScaffoldError::SchemaViolationError {
            resource: mapper.resource.clone(),
            property: key.clone(),
        }),
        None => Ok(()),
    }
}

fn prepare_new(mapper: &MapperDefinition, mut props: Record) -> Result<Record> {
    check_declared(mapper, &props)?;

    for (name, property) in &mapper.schema.properties {
        if let Some(default) = &property.default {
            if !props.contains_key(name) {
                props.insert(name.clone(), default.clone());
            }
        }
    }

    if let Some(missing) = mapper
        .schema
        .required
        .iter()
        .find(|name| !props.contains_key(name))
    {
        return Err(ScaffoldError::StoreError {
            message: format!("{} requires property '{}'", mapper.resource, missing),
        });
    }

    Ok(props)
}

/// Gives every id-less record the next counter value, checking explicit ids
/// against the table and each other. Nothing is written, so a failure
/// leaves the table as it was.
fn assign_ids(table: &Table, resource: &str, records: &mut [Record]) -> Result<i64> {
    let mut next_id = table.next_id;
    let mut seen = HashSet::new();

    for id in records.iter().filter_map(Record::id) {
        if table.records.contains_key(&id) || !seen.insert(id.clone()) {
            return Err(ScaffoldError::StoreError {
                message: format!("{} {} already exists", resource, id),
            });
        }
        if let RecordId::Int(n) = id {
            next_id = next_id.max(n);
        }
    }

    for record in records.iter_mut().filter(|record| record.id().is_none()) {
        next_id = next_id
            .checked_add(1)
            .ok_or_else(|| ScaffoldError::StoreError {
                message: format!("{} has no integer ids left to assign", resource),
            })?;
        record.insert(PRIMARY_KEY, RecordId::Int(next_id).to_value());
    }

    Ok(next_id)
}

fn insert_all(table: &mut Table, resource: &str, mut records: Vec<Record>) -> Result<Vec<Record>> {
    table.next_id = assign_ids(table, resource, &mut records)?;
    for record in &records {
        if let Some(id) = record.id() {
            table.records.insert(id, record.clone());
        }
    }
    Ok(records)
}

fn apply(record: &mut Record, props: &Record) {
    for (key, value) in props.data.iter() {
        if key != PRIMARY_KEY {
            record.insert(key.clone(), value.clone());
        }
    }
}

fn select<'a>(table: &'a Table, query: &Query) -> Vec<&'a Record> {
    let mut selected: Vec<&Record> = table
        .records
        .values()
        .filter(|record| query.matches(record))
        .collect();

    if !query.order_by.is_empty() {
        selected.sort_by(|a, b| {
            for (field, order) in &query.order_by {
                let left = a.get(field).unwrap_or(&Value::Null);
                let right = b.get(field).unwrap_or(&Value::Null);
                let ordering = compare_values(left, right).unwrap_or(Ordering::Equal);
                let ordering = match order {
                    Order::Asc => ordering,
                    Order::Desc => ordering.reverse(),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });
    }

    selected
        .into_iter()
        .skip(query.offset.unwrap_or(0))
        .take(query.limit.unwrap_or(usize::MAX))
        .collect()
}

#[async_trait]
impl Store for MemoryStore {
    fn define_mapper(&self, mapper: MapperDefinition) -> Result<()> {
        let mut state = self.write()?;
        let resource = mapper.resource.clone();
        if state.mappers.insert(resource.clone(), mapper).is_some() {
            tracing::warn!("Redefining mapper for resource '{}'", resource);
        }
        state.tables.entry(resource).or_default();
        Ok(())
    }

    fn get_mapper(&self, resource: &str) -> Option<MapperDefinition> {
        self.read().ok()?.mappers.get(resource).cloned()
    }

    fn is(&self, resource: &str, record: &Record) -> bool {
        let Some(id) = record.id() else {
            return false;
        };
        self.read()
            .map(|state| {
                state
                    .tables
                    .get(resource)
                    .is_some_and(|table| table.records.contains_key(&id))
            })
            .unwrap_or(false)
    }

    fn to_json(&self, resource: &str, records: &[Record], opts: &CallOptions) -> Result<Value> {
        let state = self.read()?;
        let mapper = state.mapper(resource)?;

        let items = records
            .iter()
            .map(|record| {
                let mut record = record.clone();
                if opts.strict {
                    record
                        .data
                        .retain(|key, _| key == PRIMARY_KEY || mapper.schema.has_property(key));
                }
                record.into_value()
            })
            .collect();
        Ok(Value::Array(items))
    }

    async fn create(&self, resource: &str, props: Record, opts: &CallOptions) -> Result<Record> {
        trace_call("create", resource, opts);
        let mut state = self.write()?;
        let record = prepare_new(state.mapper(resource)?, props)?;
        insert_all(state.table_mut(resource)?, resource, vec![record])?
            .pop()
            .ok_or_else(|| ScaffoldError::StoreError {
                message: format!("{} create returned no record", resource),
            })
    }

    async fn create_many(
        &self,
        resource: &str,
        records: Vec<Record>,
        opts: &CallOptions,
    ) -> Result<Vec<Record>> {
        trace_call("create_many", resource, opts);
        let mut state = self.write()?;

        let prepared = {
            let mapper = state.mapper(resource)?;
            records
                .into_iter()
                .map(|record| prepare_new(mapper, record))
                .collect::<Result<Vec<_>>>()?
        };

        insert_all(state.table_mut(resource)?, resource, prepared)
    }

    async fn find(
        &self,
        resource: &str,
        id: &RecordId,
        opts: &CallOptions,
    ) -> Result<Option<Record>> {
        trace_call("find", resource, opts);
        let state = self.read()?;
        Ok(state.table(resource)?.records.get(id).cloned())
    }

    async fn find_all(
        &self,
        resource: &str,
        query: &Query,
        opts: &CallOptions,
    ) -> Result<Vec<Record>> {
        trace_call("find_all", resource, opts);
        let state = self.read()?;
        Ok(select(state.table(resource)?, query)
            .into_iter()
            .cloned()
            .collect())
    }

    async fn destroy(&self, resource: &str, id: &RecordId, opts: &CallOptions) -> Result<()> {
        trace_call("destroy", resource, opts);
        let mut state = self.write()?;
        state.table_mut(resource)?.records.remove(id);
        Ok(())
    }

    async fn destroy_all(&self, resource: &str, query: &Query, opts: &CallOptions) -> Result<()> {
        trace_call("destroy_all", resource, opts);
        let mut state = self.write()?;
        let table = state.table_mut(resource)?;
        let doomed: Vec<RecordId> = select(table, query)
            .into_iter()
            .filter_map(Record::id)
            .collect();
        for id in doomed {
            table.records.remove(&id);
        }
        Ok(())
    }

    async fn update(
        &self,
        resource: &str,
        id: &RecordId,
        props: Record,
        opts: &CallOptions,
    ) -> Result<Option<Record>> {
        trace_call("update", resource, opts);
        let mut state = self.write()?;
        check_declared(state.mapper(resource)?, &props)?;

        Ok(state.table_mut(resource)?.records.get_mut(id).map(|record| {
            apply(record, &props);
            record.clone()
        }))
    }

    async fn update_all(
        &self,
        resource: &str,
        props: Record,
        query: &Query,
        opts: &CallOptions,
    ) -> Result<Vec<Record>> {
        trace_call("update_all", resource, opts);
        let mut state = self.write()?;
        check_declared(state.mapper(resource)?, &props)?;

        let table = state.table_mut(resource)?;
        let ids: Vec<RecordId> = select(table, query)
            .into_iter()
            .filter_map(Record::id)
            .collect();

        let mut updated = Vec::with_capacity(ids.len());
        for id in &ids {
            if let Some(record) = table.records.get_mut(id) {
                apply(record, &props);
                updated.push(record.clone());
            }
        }
        Ok(updated)
    }

    async fn update_many(
        &self,
        resource: &str,
        records: Vec<Record>,
        opts: &CallOptions,
    ) -> Result<Vec<Option<Record>>> {
        trace_call("update_many", resource, opts);
        let mut state = self.write()?;

        let mut updates = Vec::with_capacity(records.len());
        {
            let mapper = state.mapper(resource)?;
            for props in records {
                check_declared(mapper, &props)?;
                let id = props.id().ok_or_else(|| ScaffoldError::StoreError {
                    message: format!("{} update is missing its primary key", resource),
                })?;
                updates.push((id, props));
            }
        }

        let table = state.table_mut(resource)?;
        Ok(updates
            .into_iter()
            .map(|(id, props)| {
                table.records.get_mut(&id).map(|record| {
                    apply(record, &props);
                    record.clone()
                })
            })
            .collect())
    }

    async fn sum(
        &self,
        resource: &str,
        field: &str,
        query: &Query,
        opts: &CallOptions,
    ) -> Result<f64> {
        trace_call("sum", resource, opts);
        let state = self.read()?;
        Ok(select(state.table(resource)?, query)
            .into_iter()
            .filter_map(|record| record.get(field).and_then(Value::as_f64))
            .sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Operator;
    use crate::domain::schema::{PropertySchema, Schema};
    use serde_json::json;

    fn store_with_posts(strict: bool) -> MemoryStore {
        let store = MemoryStore::new();
        let mut schema = Schema::new()
            .property("title", PropertySchema::string())
            .property("votes", PropertySchema::integer().with_default(0))
            .require("title");
        if strict {
            schema.additional_properties = Some(false);
        }
        store
            .define_mapper(MapperDefinition::new("posts", schema))
            .unwrap();
        store
    }

    fn post(title: &str) -> Record {
        Record::new().with("title", title)
    }

    #[tokio::test]
    async fn test_create_assigns_ids_and_defaults() {
        let store = store_with_posts(false);
        let opts = CallOptions::default();

        let first = store.create("posts", post("a"), &opts).await.unwrap();
        let second = store.create("posts", post("b"), &opts).await.unwrap();

        assert_eq!(first.id(), Some(RecordId::Int(1)));
        assert_eq!(second.id(), Some(RecordId::Int(2)));
        assert_eq!(first.get("votes"), Some(&json!(0)));
        assert!(store.is("posts", &first));
        assert!(!store.is("posts", &post("not stored")));
    }

    #[tokio::test]
    async fn test_strict_schema_rejects_undeclared_properties() {
        let store = store_with_posts(true);
        let opts = CallOptions::default();

        let err = store
            .create("posts", post("a").with("extra", 1), &opts)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ScaffoldError::SchemaViolationError { ref property, .. } if property == "extra"
        ));
        assert_eq!(store.count("posts"), 0);
    }

    #[tokio::test]
    async fn test_required_properties_are_enforced() {
        let store = store_with_posts(false);
        let result = store
            .create("posts", Record::new(), &CallOptions::default())
            .await;
        assert!(matches!(result, Err(ScaffoldError::StoreError { .. })));
    }

    #[tokio::test]
    async fn test_query_ordering_and_paging() {
        let store = store_with_posts(false);
        let opts = CallOptions::default();
        for (title, votes) in [("a", 5), ("b", 1), ("c", 9), ("d", 3)] {
            store
                .create("posts", post(title).with("votes", votes), &opts)
                .await
                .unwrap();
        }

        let query = Query::all()
            .filter("votes", Operator::Gt, 1)
            .order_by("votes", Order::Desc)
            .offset(1)
            .limit(2);
        let titles: Vec<Value> = store
            .find_all("posts", &query, &opts)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.get("title").cloned().unwrap())
            .collect();

        assert_eq!(titles, vec![json!("a"), json!("d")]);
        assert_eq!(
            store.sum("posts", "votes", &Query::all(), &opts).await.unwrap(),
            18.0
        );
    }

    #[tokio::test]
    async fn test_update_missing_record_is_none() {
        let store = store_with_posts(false);
        let updated = store
            .update("posts", &RecordId::Int(42), post("x"), &CallOptions::default())
            .await
            .unwrap();
        assert!(updated.is_none());
    }

    #[tokio::test]
    async fn test_update_many_lines_up_with_input() {
        let store = store_with_posts(false);
        let opts = CallOptions::default();
        store.create("posts", post("a"), &opts).await.unwrap();

        let results = store
            .update_many(
                "posts",
                vec![post("a2").with("id", 1), post("zz").with("id", 99)],
                &opts,
            )
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].as_ref().unwrap().get("title"), Some(&json!("a2")));
        assert!(results[1].is_none());
    }

    #[tokio::test]
    async fn test_destroy_all_with_query() {
        let store = store_with_posts(false);
        let opts = CallOptions::default();
        for title in ["a", "b", "c"] {
            store.create("posts", post(title), &opts).await.unwrap();
        }

        store
            .destroy_all("posts", &Query::where_eq("title", "b"), &opts)
            .await
            .unwrap();
        assert_eq!(store.count("posts"), 2);

        store.destroy("posts", &RecordId::Int(77), &opts).await.unwrap();
        assert_eq!(store.count("posts"), 2);
    }

    #[test]
    fn test_explicit_ids_advance_the_counter() {
        let store = store_with_posts(false);
        let opts = CallOptions::default();

        tokio_test::block_on(async {
            store
                .create("posts", post("a").with("id", 10), &opts)
                .await
                .unwrap();
            let next = store.create("posts", post("b"), &opts).await.unwrap();
            assert_eq!(next.id(), Some(RecordId::Int(11)));

            let clash = store.create("posts", post("c").with("id", 10), &opts).await;
            assert!(clash.is_err());
        });
    }

    #[tokio::test]
    async fn test_exhausted_id_counter_is_an_error() {
        let store = store_with_posts(false);
        let opts = CallOptions::default();

        store
            .create("posts", post("last").with("id", i64::MAX), &opts)
            .await
            .unwrap();
        let result = store.create("posts", post("overflow"), &opts).await;

        assert!(matches!(result, Err(ScaffoldError::StoreError { .. })));
        assert_eq!(store.count("posts"), 1);
    }

    #[tokio::test]
    async fn test_create_many_is_all_or_nothing() {
        let store = store_with_posts(false);
        let opts = CallOptions::default();
        store
            .create("posts", post("taken").with("id", 5), &opts)
            .await
            .unwrap();

        let clash_with_table = store
            .create_many("posts", vec![post("a"), post("b").with("id", 5)], &opts)
            .await;
        assert!(clash_with_table.is_err());

        let clash_in_batch = store
            .create_many(
                "posts",
                vec![post("c").with("id", 7), post("d"), post("e").with("id", 7)],
                &opts,
            )
            .await;
        assert!(clash_in_batch.is_err());
        assert_eq!(store.count("posts"), 1);

        let created = store
            .create_many("posts", vec![post("f"), post("g").with("id", 9)], &opts)
            .await
            .unwrap();
        let ids: Vec<_> = created.iter().filter_map(Record::id).collect();
        assert_eq!(ids, vec![RecordId::Int(10), RecordId::Int(9)]);
    }

    #[tokio::test]
    async fn test_unknown_resource_is_an_error() {
        let store = MemoryStore::new();
        let result = store
            .find("ghosts", &RecordId::Int(1), &CallOptions::default())
            .await;
        assert!(matches!(result, Err(ScaffoldError::StoreError { .. })));
    }

    #[test]
    fn test_to_json_strict_drops_undeclared() {
        let store = store_with_posts(false);
        let record = post("a").with("id", 1).with("scratch", true);

        let lenient = store
            .to_json("posts", &[record.clone()], &CallOptions::default())
            .unwrap();
        let strict = store
            .to_json("posts", &[record], &CallOptions::default().strict())
            .unwrap();

        assert_eq!(lenient, json!([{"id": 1, "title": "a", "scratch": true}]));
        assert_eq!(strict, json!([{"id": 1, "title": "a"}]));
    }
}
