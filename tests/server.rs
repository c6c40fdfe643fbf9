mod common;

use anyhow::Result;
use std::time::Duration;

use sizetrack::{ObjectChangeEvent, OrchestrationError, PlotRequest, RenderDriver};

#[tokio::test]
async fn test_root_and_status_endpoints() -> Result<()> {
    let dir = common::setup_temp_dir()?;
    let store = common::open_store(&dir.path().join("history"))?;
    common::seed_record(&store, "my-bucket", 1000, 100, 1)?;
    let (base_url, server_handle) =
        common::start_test_server(store, &dir.path().join("plots")).await?;

    let client = reqwest::Client::new();

    let res = client.get(format!("{}/", base_url)).send().await?;
    assert!(res.status().is_success());
    let body = res.text().await?;
    assert!(body.contains("sizetrack server"));

    let res = client.get(format!("{}/status", base_url)).send().await?;
    assert!(res.status().is_success());
    let json: serde_json::Value = res.json().await?;
    assert_eq!(json["server"]["version"], "test");
    assert_eq!(json["history"]["bucket_count"], 1);
    assert_eq!(json["history"]["buckets"][0]["bucket"], "my-bucket");
    assert_eq!(json["history"]["buckets"][0]["sizeBytes"], 100);

    server_handle.abort();
    Ok(())
}

#[tokio::test]
async fn test_event_ingest_and_history_queries() -> Result<()> {
    let dir = common::setup_temp_dir()?;
    let store = common::open_store(&dir.path().join("history"))?;
    let (base_url, server_handle) =
        common::start_test_server(store, &dir.path().join("plots")).await?;

    let client = reqwest::Client::new();

    // two creates
    for (key, size, t, id) in [("a.txt", 100u64, 1000i64, "d-1"), ("b.txt", 50, 2000, "d-2")] {
        let event = ObjectChangeEvent::created("my-bucket", key, size, t, id);
        let res = client
            .post(format!("{}/events", base_url))
            .json(&event)
            .send()
            .await?;
        assert!(res.status().is_success());
    }

    // latest reflects both
    let res = client.get(format!("{}/latest/my-bucket", base_url)).send().await?;
    assert!(res.status().is_success());
    let latest: serde_json::Value = res.json().await?;
    assert_eq!(latest["sizeBytes"], 150);
    assert_eq!(latest["objectCount"], 2);

    // replayed delivery id is a no-op returning the original record
    let replay = ObjectChangeEvent::created("my-bucket", "a.txt", 100, 1000, "d-1");
    let res = client
        .post(format!("{}/events", base_url))
        .json(&replay)
        .send()
        .await?;
    assert!(res.status().is_success());
    let body: serde_json::Value = res.json().await?;
    assert_eq!(body["status"], "duplicate");
    assert_eq!(body["record"]["timestamp"], 1000);

    let res = client.get(format!("{}/history/my-bucket", base_url)).send().await?;
    let records: serde_json::Value = res.json().await?;
    assert_eq!(records.as_array().unwrap().len(), 2);

    // range narrows
    let res = client
        .get(format!("{}/history/my-bucket?start=1500&end=2500", base_url))
        .send()
        .await?;
    let records: serde_json::Value = res.json().await?;
    assert_eq!(records.as_array().unwrap().len(), 1);
    assert_eq!(records[0]["timestamp"], 2000);

    // peak via the secondary access path
    let res = client.get(format!("{}/max/my-bucket", base_url)).send().await?;
    let max: serde_json::Value = res.json().await?;
    assert_eq!(max["sizeBytes"], 150);

    // malformed envelope is a validation failure, not a retryable one
    let res = client
        .post(format!("{}/events", base_url))
        .body("{not json")
        .send()
        .await?;
    assert_eq!(res.status().as_u16(), 422);
    let err: serde_json::Value = res.json().await?;
    assert_eq!(err["error"]["code"], "invalid_event");

    // unknown bucket has no data yet
    let res = client.get(format!("{}/latest/empty-bucket", base_url)).send().await?;
    assert_eq!(res.status().as_u16(), 404);
    let err: serde_json::Value = res.json().await?;
    assert_eq!(err["error"]["code"], "no_data");

    server_handle.abort();
    Ok(())
}

#[tokio::test]
async fn test_plot_endpoint() -> Result<()> {
    let dir = common::setup_temp_dir()?;
    let store = common::open_store(&dir.path().join("history"))?;
    common::seed_record(&store, "my-bucket", 1000, 100, 1)?;
    common::seed_record(&store, "my-bucket", 2000, 150, 2)?;
    let (base_url, server_handle) =
        common::start_test_server(store, &dir.path().join("plots")).await?;

    let client = reqwest::Client::new();

    // successful render returns a durable artifact reference
    let res = client
        .get(format!("{}/plot?bucket=my-bucket", base_url))
        .send()
        .await?;
    assert!(res.status().is_success());
    let artifact: serde_json::Value = res.json().await?;
    let location = artifact["location"].as_str().unwrap();
    assert!(artifact["generatedAt"].as_i64().unwrap() > 0);
    let svg = std::fs::read_to_string(location)?;
    assert!(svg.contains("<svg"));

    // empty range: no_data, and nothing published
    let res = client
        .get(format!("{}/plot?bucket=my-bucket&start=5000&end=6000", base_url))
        .send()
        .await?;
    assert_eq!(res.status().as_u16(), 404);
    let err: serde_json::Value = res.json().await?;
    assert_eq!(err["error"]["code"], "no_data");

    // inverted range is a validation failure
    let res = client
        .get(format!("{}/plot?bucket=my-bucket&start=2000&end=1000", base_url))
        .send()
        .await?;
    assert_eq!(res.status().as_u16(), 422);
    let err: serde_json::Value = res.json().await?;
    assert_eq!(err["error"]["code"], "invalid_range");

    // invalid bucket name is rejected before touching the store
    let res = client
        .get(format!("{}/plot?bucket=NOT%20VALID", base_url))
        .send()
        .await?;
    assert_eq!(res.status().as_u16(), 422);
    let err: serde_json::Value = res.json().await?;
    assert_eq!(err["error"]["code"], "invalid_bucket");

    // exactly one artifact was published
    assert_eq!(std::fs::read_dir(dir.path().join("plots"))?.count(), 1);

    server_handle.abort();
    Ok(())
}

#[tokio::test]
async fn test_driver_happy_path() -> Result<()> {
    let dir = common::setup_temp_dir()?;
    let store = common::open_store(&dir.path().join("history"))?;
    common::seed_record(&store, "my-bucket", 1000, 100, 1)?;
    let (base_url, server_handle) =
        common::start_test_server(store, &dir.path().join("plots")).await?;

    let driver = RenderDriver::new(&base_url)?;
    let artifact = driver
        .trigger_render(&PlotRequest {
            bucket: Some("my-bucket".to_string()),
            start: None,
            end: None,
        })
        .await?;
    assert!(std::path::Path::new(&artifact.location).exists());

    server_handle.abort();
    Ok(())
}

#[tokio::test]
async fn test_driver_terminal_errors_are_not_retried() -> Result<()> {
    let dir = common::setup_temp_dir()?;
    let store = common::open_store(&dir.path().join("history"))?;
    let (base_url, server_handle) =
        common::start_test_server(store, &dir.path().join("plots")).await?;

    let driver = RenderDriver::new(&base_url)?;

    // empty store: terminal NoData
    let err = driver
        .trigger_render(&PlotRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestrationError::NoData));

    // inverted range: terminal rejection
    let err = driver
        .trigger_render(&PlotRequest {
            bucket: None,
            start: Some(2000),
            end: Some(1000),
        })
        .await
        .unwrap_err();
    match err {
        OrchestrationError::Rejected(detail) => assert!(detail.contains("invalid_range")),
        other => panic!("expected Rejected, got {:?}", other),
    }

    server_handle.abort();
    Ok(())
}

#[tokio::test]
async fn test_driver_exhausts_retries_on_unreachable_server() -> Result<()> {
    // bind-then-drop to get a port nothing listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let dead_url = format!("http://{}", listener.local_addr()?);
    drop(listener);

    let driver = RenderDriver::with_policy(&dead_url, Duration::from_secs(2), 2)?;
    let err = driver
        .trigger_render(&PlotRequest::default())
        .await
        .unwrap_err();
    match err {
        OrchestrationError::Failed { attempts, .. } => assert_eq!(attempts, 2),
        OrchestrationError::Timeout { attempts } => assert_eq!(attempts, 2),
        other => panic!("expected terminal failure, got {:?}", other),
    }

    Ok(())
}
