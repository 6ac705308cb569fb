use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use silhouette_client::DriverClient;
use silhouette_coordinator::{CoordinatorBuilder, CoordinatorConfig};
use silhouette_store::LocalLog;
use silhouette_types::{Backend, RoundId};
use tokio::net::TcpListener;

async fn spawn_coordinator(backend: Backend) -> String {
    let config = CoordinatorConfig {
        listen_addr: "127.0.0.1:0".to_string(),
        node_id: "test-node".to_string(),
        bootstrap: true,
        peers: Vec::new(),
        backend,
        commit_timeout: Duration::from_secs(5),
        data_dir: PathBuf::from("./data"),
    };
    let log = Arc::new(LocalLog::new(config.node_id.clone()));
    let router = CoordinatorBuilder::init(&config, log).await.build();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    format!("http://{addr}")
}

#[tokio::test]
async fn publishes_and_reads_a_sealed_round() {
    let base_url = spawn_coordinator(Backend::Kvs).await;
    let client = DriverClient::new(base_url);
    let round_id = RoundId::new(1);

    client.start_round(round_id, 2).await.unwrap();
    client
        .publish_values(
            round_id,
            "w1",
            vec![
                ("a".to_string(), 1u64.to_le_bytes().to_vec()),
                ("b".to_string(), 2u64.to_le_bytes().to_vec()),
            ],
        )
        .await
        .unwrap();
    client
        .publish_values(round_id, "w2", vec![("c".to_string(), 3u64.to_le_bytes().to_vec())])
        .await
        .unwrap();

    let value = client.get_value(round_id, "b").await.unwrap();
    assert_eq!(&value[..8], &2u64.to_le_bytes());
}

#[tokio::test]
async fn get_value_rejects_an_unpublished_key() {
    let base_url = spawn_coordinator(Backend::Kvs).await;
    let client = DriverClient::new(base_url);
    let round_id = RoundId::new(2);

    client.start_round(round_id, 1).await.unwrap();
    client
        .publish_values(round_id, "w1", vec![("a".to_string(), vec![1])])
        .await
        .unwrap();

    let err = client.get_value(round_id, "missing").await.unwrap_err();
    assert!(matches!(err, silhouette_client::Error::UnknownKey(_)));
}

#[tokio::test]
async fn poll_for_seal_waits_out_an_open_round_then_succeeds() {
    let base_url = spawn_coordinator(Backend::Kvs).await;
    let client = Arc::new(DriverClient::new(base_url));
    let round_id = RoundId::new(3);

    client.start_round(round_id, 2).await.unwrap();
    client
        .publish_values(round_id, "w1", vec![("a".to_string(), vec![1])])
        .await
        .unwrap();

    let sealer = client.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        sealer
            .publish_values(round_id, "w2", vec![("b".to_string(), vec![2])])
            .await
            .unwrap();
    });

    client
        .poll_for_seal(round_id, Duration::from_millis(10), 50)
        .await
        .unwrap();

    let value = client.get_value(round_id, "a").await.unwrap();
    assert_eq!(value[0], 1);
}

#[tokio::test]
async fn poll_for_seal_times_out_on_a_round_that_never_seals() {
    let base_url = spawn_coordinator(Backend::Kvs).await;
    let client = DriverClient::new(base_url);
    let round_id = RoundId::new(4);

    client.start_round(round_id, 2).await.unwrap();

    let err = client
        .poll_for_seal(round_id, Duration::from_millis(5), 3)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        silhouette_client::Error::Coordinator(e) if e.kind == silhouette_types::ErrorKind::Timeout
    ));
}
