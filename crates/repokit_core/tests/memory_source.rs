use repokit_core::{
    Entity, MemorySource, MemorySourceError, Operation, Rename, RepoError, Repository, Stringify,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
struct Contact {
    id: Value,
    name: String,
    city: Option<String>,
}

impl Entity for Contact {}

fn contact(id: Value, name: &str, city: &str) -> Contact {
    Contact {
        id,
        name: name.to_string(),
        city: Some(city.to_string()),
    }
}

fn contacts_repo() -> (Repository<Contact>, Arc<MemorySource<Contact>>) {
    let store = Arc::new(MemorySource::<Contact>::new());
    let mut repo = Repository::<Contact>::new();
    repo.use_transform(Stringify::new("id"))
        .use_transform(Rename::new("display_name", "name"));
    repo.source(store.clone()).unwrap();
    (repo, store)
}

#[tokio::test]
async fn memory_source_binds_every_operation() {
    let (repo, _) = contacts_repo();
    assert_eq!(repo.bound_operations(), Operation::ALL.to_vec());
}

#[tokio::test]
async fn crud_round_trip_uses_wire_names() {
    let (repo, store) = contacts_repo();

    let added = repo.add(contact(json!(1), "Ann", "Oslo")).await.unwrap();
    assert_eq!(added, contact(json!("1"), "Ann", "Oslo"));
    assert_eq!(store.len().unwrap(), 1);

    let stored = repo.mapper().transform_input(&added, None).unwrap();
    assert_eq!(
        Value::Object(stored),
        json!({ "id": "1", "display_name": "Ann", "city": "Oslo" })
    );

    let loaded = repo.get(json!(1)).await.unwrap();
    assert_eq!(loaded, contact(json!("1"), "Ann", "Oslo"));

    let renamed = repo
        .update(contact(json!("1"), "Anna", "Oslo"))
        .await
        .unwrap();
    assert_eq!(renamed.name, "Anna");
    assert_eq!(repo.get(json!("1")).await.unwrap().name, "Anna");

    repo.remove(renamed).await.unwrap();
    assert!(store.is_empty().unwrap());
}

#[tokio::test]
async fn add_without_id_gets_generated_key() {
    let (repo, _) = contacts_repo();

    let added = repo
        .add(Contact {
            id: Value::Null,
            name: "Cid".to_string(),
            city: None,
        })
        .await
        .unwrap();
    let id = added.id.as_str().unwrap();
    assert_eq!(id.len(), 36);

    let fetched = repo
        .fetch(Contact {
            id: added.id.clone(),
            ..Contact::default()
        })
        .await
        .unwrap();
    assert_eq!(fetched.name, "Cid");
}

#[tokio::test]
async fn query_filters_on_wire_fields() {
    let (repo, _) = contacts_repo();
    repo.add(contact(json!(1), "Ann", "Oslo")).await.unwrap();
    repo.add(contact(json!(2), "Bo", "Rome")).await.unwrap();
    repo.add(contact(json!(3), "Cy", "Oslo")).await.unwrap();

    let in_oslo = repo.query(vec![json!({ "city": "Oslo" })]).await.unwrap();
    let names: Vec<&str> = in_oslo.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Ann", "Cy"]);

    let everyone = repo.get_all().await.unwrap();
    assert_eq!(everyone.len(), 3);
}

#[tokio::test]
async fn get_of_unknown_id_is_an_empty_instance() {
    let (repo, _) = contacts_repo();
    assert_eq!(repo.get(json!(404)).await.unwrap(), Contact::default());
}

#[tokio::test]
async fn update_of_unknown_id_surfaces_source_error() {
    let (repo, _) = contacts_repo();
    let err = repo
        .update(contact(json!(9), "Ghost", "Nowhere"))
        .await
        .unwrap_err();
    match err {
        RepoError::Source(err) => assert_eq!(
            err.downcast_ref::<MemorySourceError>(),
            Some(&MemorySourceError::NotFound("9".to_string()))
        ),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn second_memory_source_is_rejected() {
    let (mut repo, _) = contacts_repo();
    let err = repo
        .source(Arc::new(MemorySource::<Contact>::new()))
        .unwrap_err();
    assert_eq!(err.to_string(), "attempted to source duplicate operation `get`");
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
struct Doc {
    id: String,
    title: String,
}

impl Entity for Doc {}

#[tokio::test]
async fn remove_finds_record_stored_under_renamed_key() {
    let store = Arc::new(MemorySource::<Doc>::with_key_fields("_id", "id"));
    let mut repo = Repository::<Doc>::new();
    repo.use_transform(Rename::new("_id", "id"));
    repo.source(store.clone()).unwrap();

    let added = repo
        .add(Doc {
            id: "a1".to_string(),
            title: "Notes".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(added.id, "a1");
    assert_eq!(store.len().unwrap(), 1);

    repo.remove(added).await.unwrap();
    assert!(store.is_empty().unwrap());
}
