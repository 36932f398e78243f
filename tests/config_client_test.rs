// Integration tests for clients built from ClientConfig

use betterconfig::{BetterConfigClient, ClientConfig, ConfigurationProvider, PollingMode};
use mockito::Server;
use tempfile::TempDir;

const PATH: &str = "/configuration-files/samples/01/config.json";

fn manual_config(base_url: String, cache_db: Option<String>) -> ClientConfig {
    let mut config = ClientConfig::default();
    config.client.base_url = base_url;
    config.client.cache_db = cache_db;
    config.polling.mode = PollingMode::Manual;
    config
}

#[tokio::test]
async fn test_persisted_configuration_survives_restart() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("cache.db").to_string_lossy().to_string();
    let mut server = Server::new_async().await;

    let _ok = server
        .mock("GET", PATH)
        .with_status(200)
        .with_body(r#"{ "keySampleText": "persisted" }"#)
        .expect(1)
        .create_async()
        .await;

    {
        let client = BetterConfigClient::from_config(&manual_config(server.url(), Some(db.clone())))
            .unwrap();
        client.force_refresh().await;
        assert_eq!(client.get_string_value("keySampleText", "").await, "persisted");
        client.close().await;
    }

    let _down = server
        .mock("GET", PATH)
        .with_status(500)
        .create_async()
        .await;

    let restarted =
        BetterConfigClient::from_config(&manual_config(server.url(), Some(db))).unwrap();
    restarted.force_refresh().await;
    assert_eq!(
        restarted.get_string_value("keySampleText", "").await,
        "persisted"
    );
}

#[tokio::test]
async fn test_fetch_always_mode() {
    let mut server = Server::new_async().await;
    let _first = server
        .mock("GET", PATH)
        .with_status(200)
        .with_body(r#"{ "keyInteger": 1 }"#)
        .expect(1)
        .create_async()
        .await;
    let _second = server
        .mock("GET", PATH)
        .with_status(200)
        .with_body(r#"{ "keyInteger": 2 }"#)
        .create_async()
        .await;

    let mut config = ClientConfig::default();
    config.client.base_url = server.url();
    config.polling.mode = PollingMode::FetchAlways;

    let client = BetterConfigClient::from_config(&config).unwrap();
    assert_eq!(client.get_integer_value("keyInteger", 0).await, 1);
    assert_eq!(client.get_integer_value("keyInteger", 0).await, 2);
}

#[tokio::test]
async fn test_invalid_interval_rejected() {
    let mut config = ClientConfig::default();
    config.polling.mode = PollingMode::AutoPoll;
    config.polling.interval_seconds = Some(1);

    assert!(BetterConfigClient::from_config(&config).is_err());
}

#[tokio::test]
async fn test_invalid_max_wait_rejected() {
    let mut config = ClientConfig::default();
    config.client.max_wait_time_for_sync_calls_seconds = 1;

    assert!(BetterConfigClient::from_config(&config).is_err());
}
