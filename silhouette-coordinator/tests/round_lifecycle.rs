use base64::Engine as _;
use serde_json::Value;
use silhouette_types::Backend;

mod setup;

use setup::TestNode;

fn decode(value: &Value) -> Vec<u8> {
    base64::engine::general_purpose::STANDARD
        .decode(value.as_str().expect("base64 string"))
        .expect("valid base64")
}

#[tokio::test]
async fn two_worker_round_seals_over_http() {
    let node = TestNode::start(Backend::Kvs).await;
    node.start_round(1, 2).await;

    node.publish_values(
        1,
        "w1",
        &[("a", &1u64.to_le_bytes()), ("b", &2u64.to_le_bytes())],
    )
    .await;
    node.publish_values(1, "w2", &[("c", &3u64.to_le_bytes())])
        .await;

    let mapping = node.get_key_mapping(1).await;
    let entries = mapping["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0]["key"], "a");
    assert_eq!(entries[1]["key"], "b");
    assert_eq!(entries[2]["key"], "c");

    let base_params_resp = node
        .server
        .post("/api/v1/get_base_params")
        .json(&serde_json::json!({ "round_id": 1 }))
        .await;
    let base_params_bytes = decode(&base_params_resp.json::<Value>()["base_params"]);
    let base_params = silhouette_pir::BaseParams::from_bytes(&base_params_bytes).unwrap();

    let mut session = silhouette_pir::PirSession::new(base_params);
    let query = session.generate_query(1).unwrap();
    let wire_query = silhouette_pir::wire::encode(&query);

    let get_value_resp = node
        .server
        .post("/api/v1/get_value")
        .json(&serde_json::json!({
            "round_id": 1,
            "pir_query": base64::engine::general_purpose::STANDARD.encode(&wire_query),
        }))
        .await;
    let response_bytes = decode(&get_value_resp.json::<Value>()["pir_response"]);
    let response = silhouette_pir::wire::decode(&response_bytes).unwrap();
    let decoded = session.decode_response(&response).unwrap();
    assert_eq!(&decoded[..8], &2u64.to_le_bytes());
}

#[tokio::test]
async fn empty_round_seals_empty_over_http() {
    let node = TestNode::start(Backend::Kvs).await;
    node.start_round(3, 3).await;
    for worker in ["w1", "w2", "w3"] {
        node.publish_values(3, worker, &[]).await;
    }

    let base_params_resp = node
        .server
        .post("/api/v1/get_base_params")
        .json(&serde_json::json!({ "round_id": 3 }))
        .await;
    base_params_resp.assert_status_not_found();

    let get_value_resp = node
        .server
        .post("/api/v1/get_value")
        .json(&serde_json::json!({ "round_id": 3, "pir_query": "" }))
        .await;
    get_value_resp.assert_status(axum::http::StatusCode::PRECONDITION_FAILED);
}

#[tokio::test]
async fn duplicate_worker_publish_is_last_write_wins_over_http() {
    let node = TestNode::start(Backend::Kvs).await;
    node.start_round(4, 2).await;

    node.publish_values(4, "w1", &[("x", b"v1")]).await;
    node.publish_values(4, "w1", &[("x", b"v1u")]).await;
    node.publish_values(4, "w2", &[("y", b"v2")]).await;

    let mapping = node.get_key_mapping(4).await;
    let entries = mapping["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
}

#[tokio::test]
async fn non_existent_round_is_not_found_over_http() {
    let node = TestNode::start(Backend::Kvs).await;
    let response = node
        .server
        .post("/api/v1/get_value")
        .json(&serde_json::json!({ "round_id": 999, "pir_query": "" }))
        .await;
    response.assert_status_not_found();
}

#[tokio::test]
async fn empty_worker_id_is_rejected_as_invalid_argument() {
    let node = TestNode::start(Backend::Kvs).await;
    node.start_round(5, 1).await;
    let response = node
        .server
        .post("/api/v1/publish_values")
        .json(&serde_json::json!({ "round_id": 5, "worker_id": "", "pairs": [] }))
        .await;
    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
}
