use serde_json::{json, Value};
use std::sync::Arc;
use watchman_api::mock::MockTransport;
use watchman_api::{ApiClient, ApiRequest, SlackApi};
use watchman_scanner::{JsonSink, RunOptions, Watchman};
use watchman_signatures::{Location, Scope, Signature, SignatureMeta, SignatureRegistry, TestCases};
use watchman_slack::Fetcher;

const OLDEST: i64 = 1_700_000_000;
const SECRET: &str = "api_key=abcdef0123456789";

fn param<'a>(request: &'a ApiRequest, key: &str) -> &'a str {
    request.params.get(key).unwrap_or_default()
}

fn signature(scope: Vec<Scope>, locations: Vec<Location>) -> Signature {
    Signature {
        filename: "api_keys.yaml".to_string(),
        enabled: true,
        meta: SignatureMeta {
            name: "API Keys".to_string(),
            author: "security".to_string(),
            date: "2024-01-01".to_string(),
            version: "1.0".to_string(),
            description: "Generic API keys".to_string(),
            severity: 70,
        },
        scope,
        locations,
        file_types: Vec::new(),
        search_strings: vec!["api_key".to_string()],
        pattern: "api_key=[A-Za-z0-9]{16}".to_string(),
        test_cases: TestCases::default(),
    }
}

fn registry(signature: Signature) -> SignatureRegistry {
    SignatureRegistry::from_signatures([signature])
}

/// An enterprise with two workspaces, one user, a public channel listed
/// under both workspaces and a direct message, each holding one secret.
fn enterprise() -> Arc<MockTransport> {
    let mock = Arc::new(MockTransport::new());

    mock.on("discovery.enterprise.info", |_| {
        json!({ "ok": true, "enterprise": { "id": "E1", "teams": [
            { "id": "T1", "name": "alpha", "domain": "alpha" },
            { "id": "T2", "name": "beta", "domain": "beta" }
        ]}})
    });
    mock.on("team.info", |request| {
        let team = param(request, "team");
        match team {
            "E1" => json!({ "ok": true, "team": { "id": "E1", "name": "Acme", "domain": "acme" } }),
            _ => json!({ "ok": true, "team": { "id": team, "name": team, "domain": team.to_lowercase() } }),
        }
    });
    mock.on("discovery.users.list", |_| {
        json!({ "ok": true, "users": [
            { "id": "U1", "name": "dev", "profile": { "email": "dev@example.com" }, "teams": ["T1"] }
        ]})
    });
    mock.on("discovery.files.list", |_| json!({ "ok": true, "files": [] }));
    mock.on("discovery.conversations.recent", |_| {
        json!({ "ok": true, "channels": [
            { "id": "C1", "team": "T1" },
            { "id": "C1", "team": "T2" },
            { "id": "D1", "team": "T1" }
        ]})
    });
    mock.on("discovery.conversations.history", |request| {
        let (id, ts, text) = match param(request, "channel") {
            "C1" => ("m1", "1700000100.000100", SECRET),
            _ => ("m2", "1700000200.000200", "api_key=zyxwvu9876543210"),
        };
        json!({ "ok": true, "messages": [
            { "client_msg_id": id, "ts": ts, "user": "U1", "team": "T1", "type": "message", "text": text }
        ]})
    });
    mock.on("discovery.conversations.info", |request| {
        let channel = param(request, "channel");
        json!({ "ok": true, "info": [{
            "id": channel,
            "name": format!("name-{channel}"),
            "is_im": channel.starts_with('D'),
        }]})
    });
    mock.on("discovery.chat.tombstone", |_| json!({ "ok": true }));

    mock
}

fn watchman(mock: &Arc<MockTransport>, options: RunOptions) -> Watchman {
    let fetcher = Fetcher::new(SlackApi::new(ApiClient::new(mock.clone())), OLDEST, 2);
    Watchman::new(fetcher, options)
}

fn lines(sink: JsonSink<Vec<u8>>) -> Vec<Value> {
    String::from_utf8(sink.into_inner())
        .expect("utf8 output")
        .lines()
        .map(|line| serde_json::from_str(line).expect("json line"))
        .collect()
}

fn of_type<'a>(lines: &'a [Value], notify_type: &str) -> Vec<&'a Value> {
    lines
        .iter()
        .filter(|line| line["notify_type"] == notify_type)
        .collect()
}

#[tokio::test]
async fn test_public_match_reported_once() {
    let mock = enterprise();
    let sink = JsonSink::new(Vec::new());

    let summary = watchman(&mock, RunOptions::default())
        .run(
            &registry(signature(vec![Scope::Messages], vec![Location::Public])),
            &sink,
        )
        .await
        .expect("run");

    assert_eq!(summary.results, 1);
    assert_eq!(summary.messages, 3);
    assert_eq!(summary.workspaces, 2);
    assert_eq!(summary.users, 1);
    assert!(summary.remediation.is_none());

    let lines = lines(sink);
    let results = of_type(&lines, "result");
    assert_eq!(results.len(), 1);

    let data = &results[0]["detection_data"];
    assert_eq!(data["match_string"], SECRET);
    assert_eq!(data["message"]["client_msg_id"], "m1");
    assert_eq!(data["conversation"]["id"], "C1");
    assert_eq!(data["user"]["email"], "dev@example.com");
    assert_eq!(
        data["url"],
        "https://alpha.slack.com/archives/C1/p1700000100000100"
    );
    assert_eq!(results[0]["severity"], 70);
    assert_eq!(results[0]["detection_type"], "API Keys");
    assert_eq!(of_type(&lines, "enterprise").len(), 1);
}

#[tokio::test]
async fn test_direct_message_reported_when_location_allows_it() {
    let mock = enterprise();
    let sink = JsonSink::new(Vec::new());

    let summary = watchman(&mock, RunOptions::default())
        .run(
            &registry(signature(
                vec![Scope::Messages],
                vec![Location::Public, Location::Im],
            )),
            &sink,
        )
        .await
        .expect("run");

    assert_eq!(summary.results, 2);
    let lines = lines(sink);
    let mut channels: Vec<&str> = of_type(&lines, "result")
        .iter()
        .filter_map(|line| line["detection_data"]["conversation"]["id"].as_str())
        .collect();
    channels.sort_unstable();
    assert_eq!(channels, vec!["C1", "D1"]);
}

#[tokio::test]
async fn test_tombstone_replaces_matched_message() {
    let mock = enterprise();
    let sink = JsonSink::new(Vec::new());
    let options = RunOptions {
        tombstone: true,
        replacement_text: Some("Removed by security".to_string()),
        ..RunOptions::default()
    };

    let summary = watchman(&mock, options)
        .run(
            &registry(signature(vec![Scope::Messages], vec![Location::Public])),
            &sink,
        )
        .await
        .expect("run");

    let report = summary.remediation.expect("remediation report");
    assert_eq!(report.tombstoned, 1);
    assert!(report.failures.is_empty());

    let calls = mock.calls_to("discovery.chat.tombstone");
    assert_eq!(calls.len(), 1);
    assert_eq!(param(&calls[0], "ts"), "1700000100.000100");
    assert_eq!(param(&calls[0], "channel"), "C1");
    assert_eq!(param(&calls[0], "team"), "T1");
    assert_eq!(param(&calls[0], "content"), "Removed by security");
}

#[tokio::test]
async fn test_failed_tombstone_is_recorded() {
    let mock = enterprise();
    mock.on("discovery.chat.tombstone", |_| {
        json!({ "ok": false, "error": "message_not_found" })
    });
    let sink = JsonSink::new(Vec::new());
    let options = RunOptions {
        tombstone: true,
        ..RunOptions::default()
    };

    let summary = watchman(&mock, options)
        .run(
            &registry(signature(vec![Scope::Messages], vec![Location::Public])),
            &sink,
        )
        .await
        .expect("run");

    let report = summary.remediation.expect("remediation report");
    assert_eq!(report.tombstoned, 0);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].target, "1700000100.000100");
    assert_eq!(summary.results, 1);
}

#[tokio::test]
async fn test_missing_scope_ends_run() {
    let mock = enterprise();
    mock.on("discovery.conversations.history", |_| {
        json!({ "ok": false, "error": "missing_scope", "needed": "discovery:read" })
    });
    let sink = JsonSink::new(Vec::new());

    let err = watchman(&mock, RunOptions::default())
        .run(
            &registry(signature(vec![Scope::Messages], vec![Location::Public])),
            &sink,
        )
        .await
        .unwrap_err();

    assert!(err.is_fatal());
    assert!(err.to_string().contains("discovery:read"));
    assert!(of_type(&lines(sink), "result").is_empty());
}

#[tokio::test]
async fn test_enumeration_notifications() {
    let mock = enterprise();
    mock.on("discovery.conversations.list", |_| {
        json!({ "ok": true, "channels": [{ "id": "C1", "team": "T1", "created": OLDEST + 1 }] })
    });
    let sink = JsonSink::new(Vec::new());
    let options = RunOptions {
        enumerate_users: true,
        enumerate_workspaces: true,
        enumerate_conversations: true,
        ..RunOptions::default()
    };

    let summary = watchman(&mock, options)
        .run(&SignatureRegistry::new(), &sink)
        .await
        .expect("run");

    assert_eq!(summary.conversations, 1);
    assert_eq!(summary.results, 0);
    let lines = lines(sink);
    assert_eq!(of_type(&lines, "workspace").len(), 2);
    assert_eq!(of_type(&lines, "user").len(), 1);
    assert_eq!(of_type(&lines, "conversation").len(), 1);
    assert_eq!(
        of_type(&lines, "user")[0]["detection_data"]["workspaces"][0]["id"],
        "T1"
    );
}

#[tokio::test]
async fn test_drafts_scanned_for_draft_signatures() {
    let mock = enterprise();
    mock.on("discovery.drafts.list", |request| {
        let team = param(request, "team").to_string();
        json!({ "ok": true, "drafts": [{
            "id": format!("draft-{team}"),
            "team_id": team,
            "user_id": "U1",
            "date_created": OLDEST + 60,
            "destinations": [{ "channel_id": "C1" }],
            "blocks": [{
                "type": "rich_text",
                "elements": [{ "type": "rich_text_section", "elements": [
                    { "type": "text", "text": format!("new key {SECRET}") }
                ]}]
            }]
        }]})
    });
    let sink = JsonSink::new(Vec::new());

    let summary = watchman(&mock, RunOptions::default())
        .run(
            &registry(signature(vec![Scope::Drafts], vec![Location::Public])),
            &sink,
        )
        .await
        .expect("run");

    assert_eq!(summary.drafts, 2);
    assert_eq!(summary.results, 2);
    assert_eq!(mock.calls_to("discovery.drafts.list").len(), 2);

    let lines = lines(sink);
    let results = of_type(&lines, "result");
    assert!(results
        .iter()
        .all(|line| line["scope"] == "drafts" && line["detection_data"]["match_string"] == SECRET));
}

fn file_signature(file_types: Vec<String>) -> Signature {
    Signature {
        filename: "credential_files.yaml".to_string(),
        scope: vec![Scope::Files],
        file_types,
        search_strings: vec!["password".to_string()],
        pattern: "password_[a-z]{8}".to_string(),
        ..signature(vec![Scope::Files], vec![Location::Public])
    }
}

/// Three shared files: a text file titled with a search string and shared to
/// a public channel and a direct message, a pdf with the same title and an
/// unrelated text file.
fn with_files(mock: &Arc<MockTransport>) {
    mock.on("discovery.files.list", |_| {
        json!({ "ok": true, "files": [{ "id": "F1" }, { "id": "F2" }, { "id": "F3" }] })
    });
    mock.on("discovery.file.info", |request| {
        let id = param(request, "file").to_string();
        let (title, filetype) = match id.as_str() {
            "F1" => ("my password.txt", "text"),
            "F2" => ("my password.pdf", "pdf"),
            _ => ("notes.txt", "text"),
        };
        json!({ "ok": true, "file": {
            "id": id,
            "team": "T1",
            "user": "U1",
            "title": title,
            "filetype": filetype,
            "created": OLDEST + 30,
            "url_private_download": format!("https://files.example.com/{id}"),
            "shares": [{ "channel": "C1", "team": "T1" }, { "channel": "D1" }]
        }})
    });
}

#[tokio::test]
async fn test_file_match_filtered_by_type_and_location() {
    let mock = enterprise();
    with_files(&mock);
    let sink = JsonSink::new(Vec::new());

    let summary = watchman(&mock, RunOptions::default())
        .run(&registry(file_signature(vec!["text".to_string()])), &sink)
        .await
        .expect("run");

    assert_eq!(summary.files, 3);
    assert_eq!(summary.results, 1);

    let lines = lines(sink);
    let results = of_type(&lines, "result");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["scope"], "files");

    let data = &results[0]["detection_data"];
    assert_eq!(data["file"]["id"], "F1");
    assert_eq!(data["conversation"]["id"], "C1");
    assert_eq!(data["match_string"], "password");
    assert_eq!(data["url"], "https://files.example.com/F1");
}

#[tokio::test]
async fn test_file_without_declared_types_matches_any_type() {
    let mock = enterprise();
    with_files(&mock);
    let sink = JsonSink::new(Vec::new());

    let summary = watchman(&mock, RunOptions::default())
        .run(&registry(file_signature(Vec::new())), &sink)
        .await
        .expect("run");

    assert_eq!(summary.results, 2);
    let lines = lines(sink);
    let mut ids: Vec<&str> = of_type(&lines, "result")
        .iter()
        .filter_map(|line| line["detection_data"]["file"]["id"].as_str())
        .collect();
    ids.sort_unstable();
    assert_eq!(ids, vec!["F1", "F2"]);
}

#[tokio::test]
async fn test_search_string_without_pattern_match_is_not_a_result() {
    let mock = enterprise();
    mock.on("discovery.conversations.history", |request| {
        let text = match param(request, "channel") {
            "C1" => "api_key=short",
            _ => "nothing here",
        };
        json!({ "ok": true, "messages": [
            { "client_msg_id": "m1", "ts": "1700000100.000100", "user": "U1", "team": "T1", "type": "message", "text": text }
        ]})
    });
    let sink = JsonSink::new(Vec::new());

    let summary = watchman(&mock, RunOptions::default())
        .run(
            &registry(signature(vec![Scope::Messages], vec![Location::Public])),
            &sink,
        )
        .await
        .expect("run");

    assert_eq!(summary.messages, 3);
    assert_eq!(summary.results, 0);
    assert!(of_type(&lines(sink), "result").is_empty());
    assert!(mock.calls_to("discovery.conversations.info").is_empty());
}

#[tokio::test]
async fn test_message_matched_by_two_signatures_tombstoned_once() {
    let mock = enterprise();
    let sink = JsonSink::new(Vec::new());
    let options = RunOptions {
        tombstone: true,
        ..RunOptions::default()
    };

    let mut second = signature(vec![Scope::Messages], vec![Location::Public]);
    second.meta.name = "Long API Keys".to_string();
    second.filename = "long_api_keys.yaml".to_string();
    let registry = SignatureRegistry::from_signatures([
        signature(vec![Scope::Messages], vec![Location::Public]),
        second,
    ]);

    let summary = watchman(&mock, options)
        .run(&registry, &sink)
        .await
        .expect("run");

    assert_eq!(summary.results, 2);
    let report = summary.remediation.expect("remediation report");
    assert_eq!(report.tombstoned, 1);
    assert_eq!(report.skipped, 1);
    assert!(report.failures.is_empty());
    assert_eq!(mock.calls_to("discovery.chat.tombstone").len(), 1);
}
