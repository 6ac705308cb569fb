use std::{path::PathBuf, sync::Arc, time::Duration};

use axum_test::TestServer;
use serde_json::{Value, json};
use silhouette_coordinator::{CoordinatorBuilder, CoordinatorConfig};
use silhouette_store::LocalLog;
use silhouette_types::Backend;

pub struct TestNode {
    pub server: TestServer,
}

impl TestNode {
    pub async fn start(backend: Backend) -> Self {
        let config = CoordinatorConfig {
            listen_addr: "0.0.0.0:0".to_string(),
            node_id: "test-node".to_string(),
            bootstrap: true,
            peers: Vec::new(),
            backend,
            commit_timeout: Duration::from_secs(5),
            data_dir: PathBuf::from("./data"),
        };
        let log = Arc::new(LocalLog::new(config.node_id.clone()));
        let router = CoordinatorBuilder::init(&config, log).await.build();
        let server = TestServer::builder()
            .http_transport()
            .build(router)
            .expect("can build test-server");
        Self { server }
    }

    pub async fn start_round(&self, round_id: u64, expected_workers: i32) {
        self.server
            .post("/api/v1/start_round")
            .json(&json!({ "round_id": round_id, "expected_workers": expected_workers }))
            .await
            .assert_status_ok();
    }

    pub async fn publish_values(&self, round_id: u64, worker_id: &str, pairs: &[(&str, &[u8])]) -> Value {
        let pairs: Vec<Value> = pairs
            .iter()
            .map(|(key, value)| {
                json!({ "key": key, "value": base64_encode(value) })
            })
            .collect();
        let response = self
            .server
            .post("/api/v1/publish_values")
            .json(&json!({ "round_id": round_id, "worker_id": worker_id, "pairs": pairs }))
            .await;
        response.json::<Value>()
    }

    pub async fn get_key_mapping(&self, round_id: u64) -> Value {
        self.server
            .post("/api/v1/get_key_mapping")
            .json(&json!({ "round_id": round_id }))
            .await
            .json::<Value>()
    }
}

fn base64_encode(bytes: &[u8]) -> String {
    use base64::Engine as _;
    base64::engine::general_purpose::STANDARD.encode(bytes)
}
