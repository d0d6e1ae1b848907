use serde_json::json;
use tempfile::TempDir;

use sql_relay::config::RelayOptions;
use sql_relay::correlator::SendOptions;
use sql_relay::handler::SqliteHandler;
use sql_relay::protocol::Priority;
use sql_relay::{SqlRelayError, spawn_worker};

fn db_path(dir: &TempDir) -> String {
    dir.path()
        .join("common.sqlite")
        .to_str()
        .expect("utf-8 temp path")
        .to_string()
}

#[tokio::test]
async fn full_session_through_the_relay() -> Result<(), SqlRelayError> {
    let dir = tempfile::tempdir().expect("tempdir");
    let client = spawn_worker(SqliteHandler::new(), RelayOptions::default())?;

    client.connect(&db_path(&dir)).await?;
    client
        .execute("CREATE TABLE items (id INTEGER PRIMARY KEY, name TEXT)", &[])
        .await?;

    let inserted = client
        .execute("INSERT INTO items (name) VALUES (?)", &[json!("alpha")])
        .await?;
    assert_eq!(inserted, json!({ "rows_affected": 1 }));

    let rows = client
        .execute("SELECT name FROM items ORDER BY id", &[])
        .await?;
    assert_eq!(rows, json!([{ "name": "alpha" }]));

    // Identical SQL prepares to the same worker-side handle.
    let lookup = client.prepare("SELECT name FROM items WHERE id = ?").await?;
    let duplicate = client.prepare("SELECT name FROM items WHERE id = ?").await?;
    assert_eq!(lookup.statement_id(), duplicate.statement_id());

    let row = lookup.get(&[json!(1)]).await?.expect("row");
    assert_eq!(row["name"], json!("alpha"));
    assert!(lookup.get(&[json!(99)]).await?.is_none());

    let insert = client.prepare("INSERT INTO items (name) VALUES (?)").await?;
    insert.run(&[json!("beta")]).await?;
    insert.finalize().await?;

    let listing = client.prepare("SELECT name FROM items ORDER BY id").await?;
    let all = listing.all(&[]).await?;
    assert_eq!(all, vec![json!({ "name": "alpha" }), json!({ "name": "beta" })]);

    client.disconnect().await?;
    Ok(())
}

#[tokio::test]
async fn per_request_options_flow_through_the_relay() -> Result<(), SqlRelayError> {
    let dir = tempfile::tempdir().expect("tempdir");
    let client = spawn_worker(SqliteHandler::new(), RelayOptions::default())?;

    client.connect(&db_path(&dir)).await?;
    let options = SendOptions::default()
        .with_priority(Priority::High)
        .with_ttl(std::time::Duration::from_secs(60));
    let rows = client.execute_with("SELECT 1 AS one", &[], options).await?;
    assert_eq!(rows, json!([{ "one": 1 }]));

    client.disconnect().await?;
    Ok(())
}

#[tokio::test]
async fn remote_engine_errors_reach_the_caller() -> Result<(), SqlRelayError> {
    let dir = tempfile::tempdir().expect("tempdir");
    let client = spawn_worker(SqliteHandler::new(), RelayOptions::default())?;

    client.connect(&db_path(&dir)).await?;
    match client.execute("SELECT * FROM missing_table", &[]).await {
        Err(SqlRelayError::Remote { message, .. }) => {
            assert!(message.contains("missing_table"));
        }
        other => panic!("expected remote engine error, got {other:?}"),
    }

    // Connecting twice is a handler-contract failure, also surfaced remotely.
    match client.connect(&db_path(&dir)).await {
        Err(SqlRelayError::Remote { .. }) => {}
        other => panic!("expected remote error, got {other:?}"),
    }

    client.disconnect().await?;
    Ok(())
}

#[tokio::test]
async fn dispose_refuses_further_operations() -> Result<(), SqlRelayError> {
    let dir = tempfile::tempdir().expect("tempdir");
    let client = spawn_worker(SqliteHandler::new(), RelayOptions::default())?;

    client.connect(&db_path(&dir)).await?;
    client.dispose();
    client.dispose(); // idempotent

    match client.execute("SELECT 1", &[]).await {
        Err(SqlRelayError::Disposed(_)) => Ok(()),
        other => panic!("expected disposed error, got {other:?}"),
    }
}
