//! End-to-end scenario: a `user` model with schema defaults, queried and
//! mutated through the public surface.

use doclite::prelude::*;

/// Requires `name` (string) and `age` (number); defaults `hobbies` to an
/// empty list.
struct UserSchema;

impl Schema for UserSchema {
    fn normalize(&self, mut input: Document) -> Result<Document, ValidationFailure> {
        if !matches!(input.get("name"), Some(Value::String(_))) {
            return Err(ValidationFailure::single(["name"], "expected a string"));
        }
        if !matches!(input.get("age"), Some(Value::Number(_))) {
            return Err(ValidationFailure::single(["age"], "expected a number"));
        }
        input
            .entry("hobbies".to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        Ok(input)
    }
}

fn user_db() -> Database {
    Database::builder().model("user", UserSchema).build()
}

fn id_of(document: &Document) -> DocumentId {
    document
        .get("_id")
        .and_then(Value::as_id)
        .expect("documents returned from the store carry an _id")
        .clone()
}

#[tokio::test]
async fn create_applies_schema_defaults() {
    let db = user_db();
    let users = db.collection("user").unwrap();

    let john = users
        .create(doc! { "name" => "John", "age" => 20 })
        .await
        .unwrap();

    assert_eq!(john.get("hobbies"), Some(&Value::Array(Vec::new())));
}

#[tokio::test]
async fn invalid_documents_are_rejected_before_any_mutation() {
    let db = user_db();
    let users = db.collection("user").unwrap();

    let err = users.create(doc! { "name" => 42, "age" => 20 }).await.unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));

    assert!(users.find_many(&Query::all()).await.unwrap().is_empty());
}

#[tokio::test]
async fn predicate_and_operator_queries_match() {
    let db = user_db();
    let users = db.collection("user").unwrap();
    users
        .create(doc! { "name" => "John", "age" => 20 })
        .await
        .unwrap();

    let by_closure = QueryDoc::new()
        .filter("age", FieldPredicate::new(|v| v.as_number() > Some(18.0)))
        .into();
    assert!(users.find(&by_closure).await.unwrap().is_some());

    let by_operator = QueryDoc::new()
        .filter("age", ops::between(18.0, 21.0, true))
        .into();
    assert!(users.find(&by_operator).await.unwrap().is_some());

    let too_old = QueryDoc::new().filter("age", ops::gt(40.0)).into();
    assert!(users.find(&too_old).await.unwrap().is_none());
}

#[tokio::test]
async fn update_then_read_back_changes_only_the_target_field() {
    let db = user_db();
    let users = db.collection("user").unwrap();

    let john = users
        .create(doc! { "name" => "John", "age" => 20 })
        .await
        .unwrap();
    let id = id_of(&john);

    users
        .update_by_id(&id, &UpdateDoc::new().set("age", 21).into())
        .await
        .unwrap()
        .unwrap();

    let read_back = users.find_by_id(&id).await.unwrap().unwrap();
    assert_eq!(read_back.get("age"), Some(&Value::Number(21.0)));
    assert_eq!(read_back.get("name"), Some(&Value::from("John")));
}

#[tokio::test]
async fn delete_by_id_reports_success_exactly_once() {
    let db = user_db();
    let users = db.collection("user").unwrap();

    let john = users
        .create(doc! { "name" => "John", "age" => 20 })
        .await
        .unwrap();
    let id = id_of(&john);

    assert!(users.delete_by_id(&id).await.unwrap());
    assert!(!users.delete_by_id(&id).await.unwrap());
}

#[tokio::test]
async fn array_operators_work_against_hobby_lists() {
    let db = user_db();
    let users = db.collection("user").unwrap();

    let john = users
        .create(doc! { "name" => "John", "age" => 20, "hobbies" => vec!["chess"] })
        .await
        .unwrap();
    let id = id_of(&john);

    users
        .update_by_id(&id, &UpdateDoc::new().apply("hobbies", ops::push(["sailing"])).into())
        .await
        .unwrap()
        .unwrap();

    let sailors = QueryDoc::new().filter("hobbies", ops::contains("sailing")).into();
    let found = users.find(&sailors).await.unwrap().unwrap();
    assert_eq!(
        found.get("hobbies"),
        Some(&Value::from(vec!["chess", "sailing"]))
    );
}

#[tokio::test]
async fn regex_queries_match_string_fields() {
    let db = user_db();
    let users = db.collection("user").unwrap();

    users.create(doc! { "name" => "John", "age" => 20 }).await.unwrap();
    users.create(doc! { "name" => "Jane", "age" => 22 }).await.unwrap();

    let j_to_n = QueryDoc::new()
        .filter("name", ops::regex(regex::Regex::new("^J.*n$").unwrap()))
        .into();
    let found = users.find_many(&j_to_n).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].get("name"), Some(&Value::from("John")));
}

#[tokio::test]
async fn whole_document_updates_merge_partial_returns() {
    let db = user_db();
    let users = db.collection("user").unwrap();

    let john = users
        .create(doc! { "name" => "John", "age" => 20 })
        .await
        .unwrap();
    let id = id_of(&john);

    let update = Update::transform(|doc| {
        let age = doc.get("age").and_then(Value::as_number).unwrap_or(0.0);
        Some(doc! { "age" => age + 10.0 })
    });
    let updated = users.update_by_id(&id, &update).await.unwrap().unwrap();

    assert_eq!(updated.get("age"), Some(&Value::Number(30.0)));
    assert_eq!(updated.get("name"), Some(&Value::from("John")));
}
