use serde::{Deserialize, Serialize};
use serde_json::json;
use slant_store::{get_as, keys, set_as, KvStore, SqliteStore};

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct State {
    status: String,
    message: Option<String>,
}

#[tokio::test]
async fn values_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("slant.db");
    let url = format!("sqlite://{}", db.display());
    let key = keys::quick_state_key("https://example.com/a");

    {
        let store = SqliteStore::connect(&url).await.unwrap();
        let state = State { status: "in_progress".into(), message: None };
        set_as(&store, &key, &state).await.unwrap();
        store.pool().close().await;
    }

    let store = SqliteStore::connect(&url).await.unwrap();
    let got: Option<State> = get_as(&store, &key).await.unwrap();
    assert_eq!(got, Some(State { status: "in_progress".into(), message: None }));
}

#[tokio::test]
async fn upsert_overwrites_wholesale() {
    let store = SqliteStore::connect("sqlite::memory:").await.unwrap();
    store.set("k", json!({"a": 1, "b": 2})).await.unwrap();
    store.set("k", json!({"a": 3})).await.unwrap();
    assert_eq!(store.get("k").await.unwrap(), Some(json!({"a": 3})));
}

#[tokio::test]
async fn remove_clears_every_key_for_a_url() {
    let store = SqliteStore::connect("sqlite::memory:").await.unwrap();
    let url = "https://example.com/story#top";
    for key in keys::all_keys(url) {
        store.set(&key, json!(true)).await.unwrap();
    }
    store.set("unrelated", json!(1)).await.unwrap();

    store.remove(&keys::all_keys("https://example.com/story")).await.unwrap();

    for key in keys::all_keys(url) {
        assert_eq!(store.get(&key).await.unwrap(), None, "{key}");
    }
    assert_eq!(store.get("unrelated").await.unwrap(), Some(json!(1)));
}

#[tokio::test]
async fn missing_key_reads_as_none() {
    let store = SqliteStore::connect("sqlite::memory:").await.unwrap();
    let got: Option<State> = get_as(&store, "nope").await.unwrap();
    assert!(got.is_none());
}
