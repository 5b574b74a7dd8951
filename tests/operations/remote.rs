use mockito::{Matcher, Server};
use serde_json::json;
use std::fs;
use std::net::TcpListener;
use std::path::Path;
use tempfile::tempdir;
use tidepool::core::config::AgentConfig;
use tidepool::core::dispatcher::Dispatcher;
use tidepool::core::error::AgentError;

fn dispatcher(root: &Path, api_base: &str) -> Dispatcher {
    let mut config = AgentConfig::for_data_dir(root);
    config.remote.api_base = api_base.to_string();
    config.remote.token = Some("test-token".to_string());
    config.remote.timeout_secs = 5;
    Dispatcher::new(config).expect("dispatcher")
}

/// Base URL nothing listens on.
fn dead_base() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    format!("http://{}", addr)
}

const COMMENTS_TASK: &str = "/data/comments.txt contains a list of comments, one per line. Using \
embeddings, find the most similar pair of comments and write them to /data/comments-similar.txt, one per line";

#[test]
fn most_similar_comments_use_embeddings() {
    let tmp = tempdir().expect("tempdir");
    fs::write(
        tmp.path().join("comments.txt"),
        "Great product\n\nTerrible support\nReally great product\n",
    )
    .expect("write");
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/embeddings")
        .match_header("authorization", "Bearer test-token")
        .match_body(Matcher::PartialJson(json!({
            "input": ["Great product", "Terrible support", "Really great product"]
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "data": [
                    {"index": 2, "embedding": [0.9, 0.1, 0.0]},
                    {"index": 0, "embedding": [1.0, 0.0, 0.0]},
                    {"index": 1, "embedding": [0.0, 1.0, 0.0]}
                ]
            })
            .to_string(),
        )
        .create();
    let d = dispatcher(tmp.path(), &server.url());
    d.run(COMMENTS_TASK).expect("run");

    mock.assert();
    assert_eq!(
        fs::read_to_string(tmp.path().join("comments-similar.txt")).expect("output"),
        "Great product\nReally great product\n"
    );
}

#[test]
fn single_comment_fails_before_any_request() {
    let tmp = tempdir().expect("tempdir");
    fs::write(tmp.path().join("comments.txt"), "only one\n").expect("write");
    let d = dispatcher(tmp.path(), &dead_base());
    let err = d.run(COMMENTS_TASK).unwrap_err();
    assert!(matches!(err, AgentError::OperationFailed { .. }), "{:?}", err);
}

#[test]
fn embeddings_error_status_is_remote_failure() {
    let tmp = tempdir().expect("tempdir");
    fs::write(tmp.path().join("comments.txt"), "a\nb\n").expect("write");
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/embeddings")
        .with_status(500)
        .with_body(r#"{"error":"overloaded"}"#)
        .create();
    let d = dispatcher(tmp.path(), &server.url());
    let err = d.run(COMMENTS_TASK).unwrap_err();
    mock.assert();

    match &err {
        AgentError::RemoteCallFailed { operation_id, cause } => {
            assert_eq!(operation_id, "A9");
            assert!(cause.contains("500"), "{}", cause);
        }
        other => panic!("expected RemoteCallFailed, got {:?}", other),
    }
    assert_eq!(err.class().http_status(), 502);
    assert!(!tmp.path().join("comments-similar.txt").exists());
}

#[test]
fn card_number_comes_back_without_spaces() {
    let tmp = tempdir().expect("tempdir");
    fs::write(tmp.path().join("credit_card.png"), b"\x89PNG fake image bytes").expect("write");
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/chat/completions")
        .match_header("authorization", "Bearer test-token")
        .match_body(Matcher::Regex("data:image/png;base64,".to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({"choices": [{"message": {"role": "assistant", "content": " 4111 1111 1111 1111\n"}}]})
                .to_string(),
        )
        .create();
    let d = dispatcher(tmp.path(), &server.url());
    d.run("/data/credit_card.png contains a credit card number. Pass the image to an LLM, have it \
           extract the card number, and write it without spaces to /data/credit-card.txt")
        .expect("run");

    mock.assert();
    assert_eq!(
        fs::read_to_string(tmp.path().join("credit-card.txt")).expect("output"),
        "4111111111111111"
    );
}

#[test]
fn fetch_saves_body_without_credentials() {
    let tmp = tempdir().expect("tempdir");
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/items.json")
        .match_header("authorization", Matcher::Missing)
        .with_status(200)
        .with_body(r#"{"items":[1,2,3]}"#)
        .create();
    let d = dispatcher(tmp.path(), &dead_base());
    let task = format!(
        "Download {}/items.json and save it to /data/remote/items.json",
        server.url()
    );
    d.run(&task).expect("run");

    mock.assert();
    assert_eq!(
        fs::read_to_string(tmp.path().join("remote/items.json")).expect("output"),
        r#"{"items":[1,2,3]}"#
    );
}

#[test]
fn fetch_from_unreachable_host_is_remote_failure() {
    let tmp = tempdir().expect("tempdir");
    let d = dispatcher(tmp.path(), &dead_base());
    let task = format!("fetch {}/nothing", dead_base());
    let err = d.run(&task).unwrap_err();
    assert!(matches!(err, AgentError::RemoteCallFailed { .. }), "{:?}", err);
    assert!(!tmp.path().join("fetched.txt").exists());
}
