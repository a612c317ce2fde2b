use app_scaffold::domain::model::{Operator, Order};
use app_scaffold::utils::time::is_valid_iso8601;
use app_scaffold::{
    CallOptions, MemoryStore, Model, ModelOptions, PropertySchema, Query, Record, RecordId,
    Result, Schema, ScaffoldError, Store, TimestampPolicy,
};
use serde_json::json;
use std::sync::Arc;

fn account_schema() -> Schema {
    Schema::new()
        .property("owner", PropertySchema::string())
        .property("balance", PropertySchema::number().with_default(0))
        .property("visits", PropertySchema::integer())
        .property("note", PropertySchema::string())
}

fn account_options() -> ModelOptions {
    ModelOptions::new()
        .with_store(Arc::new(MemoryStore::new()))
        .with_resource("accounts")
        .with_schema(account_schema())
}

fn accounts() -> Model {
    Model::new(account_options()).unwrap()
}

fn opts() -> CallOptions {
    CallOptions::default()
}

async fn seeded(model: &Model) -> Record {
    model
        .create(
            Record::new().with("owner", "ada").with("balance", 10).with("visits", 1),
            &opts(),
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn test_create_stamps_both_timestamps() -> Result<()> {
    let model = accounts();
    let record = seeded(&model).await;

    let created = record.get("created_at").and_then(|v| v.as_str()).unwrap();
    let updated = record.get("updated_at").and_then(|v| v.as_str()).unwrap();
    assert!(is_valid_iso8601(created));
    assert_eq!(created, updated);
    assert_eq!(record.id(), Some(RecordId::Int(1)));
    Ok(())
}

#[tokio::test]
async fn test_update_refreshes_only_updated_at() -> Result<()> {
    let model = accounts();
    let record = seeded(&model).await;
    let original_created = record.get("created_at").cloned();

    let updated = model
        .update(
            1,
            Record::new()
                .with("note", "hi")
                .with("created_at", "1999-01-01T00:00:00.000Z"),
            &opts(),
        )
        .await?
        .unwrap();

    assert_eq!(updated.get("created_at").cloned(), original_created);
    assert_eq!(updated.get("note"), Some(&json!("hi")));
    Ok(())
}

#[tokio::test]
async fn test_increment_and_decrement() -> Result<()> {
    let model = accounts();
    seeded(&model).await;

    let record = model.increment(1, "visits", 2.0, &opts()).await?.unwrap();
    assert_eq!(record.get("visits"), Some(&json!(3)));

    let record = model.decrement(1, "balance", 2.5, &opts()).await?.unwrap();
    assert_eq!(record.get("balance"), Some(&json!(7.5)));
    Ok(())
}

#[tokio::test]
async fn test_increment_missing_record_is_none() -> Result<()> {
    let model = accounts();
    assert!(model.increment(404, "visits", 1.0, &opts()).await?.is_none());
    assert!(model.find(404, &opts()).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_increment_rejects_unknown_and_non_numeric_properties() {
    let model = accounts();
    seeded(&model).await;

    let unknown = model.increment(1, "karma", 1.0, &opts()).await.unwrap_err();
    assert!(matches!(
        unknown,
        ScaffoldError::UnknownPropertyError { ref property, .. } if property == "karma"
    ));

    let text = model.increment(1, "owner", 1.0, &opts()).await.unwrap_err();
    assert!(matches!(text, ScaffoldError::NotNumericError { .. }));
}

#[tokio::test]
async fn test_touch_sets_identical_timestamps() -> Result<()> {
    let model = accounts();
    seeded(&model).await;
    model
        .set_created_at(1, Some("2020-05-01T10:00:00.000Z"), &opts())
        .await?;

    let touched = model.touch(1, &opts()).await?.unwrap();
    let created = touched.get("created_at").unwrap();
    assert_eq!(Some(created), touched.get("updated_at"));
    assert_ne!(created, &json!("2020-05-01T10:00:00.000Z"));
    Ok(())
}

#[tokio::test]
async fn test_invalid_manual_timestamp_changes_nothing() -> Result<()> {
    let model = accounts();
    let before = seeded(&model).await;

    let err = model
        .set_updated_at(1, Some("yesterday"), &opts())
        .await
        .unwrap_err();
    assert!(matches!(err, ScaffoldError::InvalidTimestampError { .. }));

    let after = model.find(1, &opts()).await?.unwrap();
    assert_eq!(before, after);
    Ok(())
}

#[tokio::test]
async fn test_manual_timestamp_changes_one_field() -> Result<()> {
    let model = accounts();
    let before = seeded(&model).await;

    let after = model
        .set_created_at(1, Some("2021-03-04T05:06:07.000Z"), &opts())
        .await?
        .unwrap();

    assert_eq!(after.get("created_at"), Some(&json!("2021-03-04T05:06:07.000Z")));
    assert_eq!(after.get("updated_at"), before.get("updated_at"));
    Ok(())
}

#[tokio::test]
async fn test_find_where_requires_declared_property() -> Result<()> {
    let model = accounts();
    seeded(&model).await;
    model
        .create(Record::new().with("owner", "grace"), &opts())
        .await?;

    let found = model.find_where("owner", "grace", &opts()).await?;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].get("balance"), Some(&json!(0)));

    let err = model.find_where("nickname", "g", &opts()).await.unwrap_err();
    assert!(matches!(err, ScaffoldError::UnknownPropertyError { .. }));
    Ok(())
}

#[tokio::test]
async fn test_timestamp_policy_suppresses_stamping() -> Result<()> {
    let model = Model::new(
        account_options()
            .with_environment("test")
            .with_timestamp_policy(TimestampPolicy::skip_in(["test", "migration"])),
    )?;

    let record = model
        .create(Record::new().with("owner", "ada"), &opts())
        .await?;
    // Only the schema defaults remain.
    assert_eq!(record.get("created_at"), Some(&json!("")));
    assert_eq!(record.get("updated_at"), Some(&json!("")));
    Ok(())
}

#[tokio::test]
async fn test_timestamps_disabled() -> Result<()> {
    let model = Model::new(account_options().timestamps(false))?;
    assert!(!model.schema().has_property("created_at"));

    let record = model
        .create(Record::new().with("owner", "ada"), &opts())
        .await?;
    assert!(!record.contains_key("updated_at"));
    Ok(())
}

#[tokio::test]
async fn test_strict_schema_rejects_undeclared_properties() {
    let model = accounts();
    let err = model
        .create(Record::new().with("owner", "ada").with("pin", 1234), &opts())
        .await
        .unwrap_err();
    assert!(matches!(err, ScaffoldError::SchemaViolationError { .. }));
}

#[tokio::test]
async fn test_lenient_model_accepts_extra_properties() -> Result<()> {
    let model = Model::new(account_options().strict(false))?;
    let record = model
        .create(Record::new().with("owner", "ada").with("pin", 1234), &opts())
        .await?;
    assert_eq!(record.get("pin"), Some(&json!(1234)));
    Ok(())
}

#[tokio::test]
async fn test_duplicate_creates_a_fresh_copy() -> Result<()> {
    let model = accounts();
    let original = seeded(&model).await;

    let copy = model.duplicate(&original, &opts()).await?;
    assert_eq!(copy.id(), Some(RecordId::Int(2)));
    assert_eq!(copy.get("owner"), original.get("owner"));

    let stranger = Record::new().with("id", 99).with("owner", "eve");
    let err = model.duplicate(&stranger, &opts()).await.unwrap_err();
    assert!(matches!(err, ScaffoldError::NotAnInstanceError { .. }));
    Ok(())
}

#[tokio::test]
async fn test_find_or_create() -> Result<()> {
    let model = accounts();
    let first = model
        .find_or_create("owner", "ada", Record::new().with("balance", 5), &opts())
        .await?;
    let second = model
        .find_or_create("owner", "ada", Record::new().with("balance", 7), &opts())
        .await?;

    assert_eq!(first.id(), second.id());
    assert_eq!(second.get("balance"), Some(&json!(5)));
    Ok(())
}

#[tokio::test]
async fn test_bulk_operations() -> Result<()> {
    let model = accounts();
    let created = model
        .create_many(
            vec![
                Record::new().with("owner", "a").with("balance", 1),
                Record::new().with("owner", "b").with("balance", 2),
                Record::new().with("owner", "c").with("balance", 3),
            ],
            &opts(),
        )
        .await?;
    assert_eq!(created.len(), 3);

    let results = model
        .update_many(
            vec![
                Record::new().with("id", 1).with("note", "first"),
                Record::new().with("id", 50).with("note", "ghost"),
            ],
            &opts(),
        )
        .await?;
    assert!(results[0].is_some());
    assert!(results[1].is_none());

    let rich = Query::all().filter("balance", Operator::Gte, 2);
    assert_eq!(model.sum("balance", &rich, &opts()).await?, 5.0);

    model
        .update_all(Record::new().with("note", "vip"), &rich, &opts())
        .await?;
    let vips = model.find_where("note", "vip", &opts()).await?;
    assert_eq!(vips.len(), 2);

    model.destroy_all(&rich, &opts()).await?;
    let left = model
        .find_all(&Query::all().order_by("owner", Order::Asc), &opts())
        .await?;
    assert_eq!(left.len(), 1);

    model.destroy(1, &opts()).await?;
    assert!(model.find_all(&Query::all(), &opts()).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_to_json_and_schema() -> Result<()> {
    let model = Model::new(account_options().with_timezone("EST"))?;
    let record = seeded(&model).await;

    let json = model.to_json(&[record], &opts())?;
    assert_eq!(json[0]["owner"], json!("ada"));
    assert!(json[0]["created_at"].as_str().unwrap().ends_with("-05:00"));

    let schema = model.schema_json();
    assert_eq!(schema["additionalProperties"], json!(false));
    assert_eq!(schema["properties"]["visits"]["type"], json!("integer"));
    assert!(schema["properties"]["updated_at"].is_object());
    Ok(())
}

#[tokio::test]
async fn test_named_timezone_stamps_its_current_offset() -> Result<()> {
    let model = Model::new(account_options().with_timezone("America/New_York"))?;
    let record = seeded(&model).await;

    let created = record.get("created_at").and_then(|v| v.as_str()).unwrap();
    assert!(is_valid_iso8601(created));
    assert!(created.ends_with("-05:00") || created.ends_with("-04:00"), "{created}");
    Ok(())
}

#[test]
fn test_construction_errors() {
    let missing_store = Model::new(ModelOptions::new().with_resource("accounts"));
    assert!(matches!(missing_store, Err(ScaffoldError::ConfigError { .. })));

    let bad_resource = Model::new(account_options().with_resource("no spaces"));
    assert!(bad_resource.is_err());

    let bad_timezone = Model::new(account_options().with_timezone("Mars/Olympus"));
    assert!(matches!(bad_timezone, Err(ScaffoldError::InvalidTimezoneError { .. })));
}

#[test]
fn test_model_registers_its_mapper() {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let model = Model::new(
        account_options()
            .with_store(store.clone())
            .with_table("tbl_accounts")
            .with_default_adapter("memory"),
    )
    .unwrap();

    let mapper = store.get_mapper("accounts").unwrap();
    assert_eq!(mapper.table.as_deref(), Some("tbl_accounts"));
    assert_eq!(mapper.default_adapter.as_deref(), Some("memory"));
    assert_eq!(model.table(), Some("tbl_accounts"));
    assert_eq!(model.name(), "accounts");
}
