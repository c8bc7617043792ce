use serde_json::json;
use std::sync::Arc;
use watchman_api::{
    ApiClient, ApiError, ApiRequest, HttpMethod, HttpTransport, Params, SlackApi, Transport,
};
use watchman_core::{ApiConfig, ApiToken};
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn transport(server: &MockServer) -> HttpTransport {
    let config = ApiConfig {
        base_url: format!("{}/api", server.uri()),
        ..ApiConfig::default()
    };
    HttpTransport::new(&config, ApiToken::new("xoxp-test").expect("valid token"))
        .expect("build transport")
}

#[tokio::test]
async fn test_get_sends_bearer_token_and_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/team.info"))
        .and(header("authorization", "Bearer xoxp-test"))
        .and(query_param("team", "T1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "ok": true, "team": { "id": "T1" } })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let request = ApiRequest {
        method: HttpMethod::Get,
        endpoint: "team.info".to_string(),
        params: Params::new().with("team", "T1"),
    };
    let body = transport(&server).send(&request).await.expect("send request");

    assert_eq!(body["team"]["id"], "T1");
}

#[tokio::test]
async fn test_post_sends_form_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/discovery.file.tombstone"))
        .and(body_string_contains("file=F1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;

    let api = SlackApi::new(ApiClient::new(Arc::new(transport(&server))));
    api.tombstone_file("F1", None).await.expect("tombstone file");
}

#[tokio::test]
async fn test_plain_429_maps_to_ratelimited() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).set_body_string("Too Many Requests"))
        .mount(&server)
        .await;

    let request = ApiRequest {
        method: HttpMethod::Get,
        endpoint: "discovery.users.list".to_string(),
        params: Params::new(),
    };
    let body = transport(&server).send(&request).await.expect("send request");

    assert_eq!(body, json!({ "ok": false, "error": "ratelimited" }));
}

#[tokio::test]
async fn test_non_json_body_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
        .mount(&server)
        .await;

    let request = ApiRequest {
        method: HttpMethod::Get,
        endpoint: "team.info".to_string(),
        params: Params::new(),
    };
    let err = transport(&server).send(&request).await.unwrap_err();

    assert!(matches!(err, ApiError::MalformedResponse { .. }));
}

#[tokio::test]
async fn test_client_paginates_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/discovery.users.list"))
        .and(query_param("offset", "U2"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "ok": true, "users": [{ "id": "U2" }] })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/discovery.users.list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            json!({ "ok": true, "offset": "U2", "users": [{ "id": "U1" }] }),
        ))
        .mount(&server)
        .await;

    let api = SlackApi::new(ApiClient::new(Arc::new(transport(&server))));
    let users = api.all_users().await.expect("list users");

    let ids: Vec<&str> = users.iter().filter_map(|u| u["id"].as_str()).collect();
    assert_eq!(ids, vec!["U1", "U2"]);
}
