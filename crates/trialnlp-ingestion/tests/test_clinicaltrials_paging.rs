//! Paging against a loopback stand-in for the v2 studies endpoint.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use trialnlp_common::config::FetchConfig;
use trialnlp_ingestion::{ClinicalTrialsClient, TrialSource};

type Requests = Arc<Mutex<Vec<HashMap<String, String>>>>;

fn study(n: usize) -> Value {
    json!({
        "protocolSection": {
            "identificationModule": { "nctId": format!("NCT{n:08}"), "briefTitle": format!("Study {n}") }
        }
    })
}

/// Three studies per page; the third page is empty but still carries a token.
async fn studies(State(requests): State<Requests>, Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    let token = params.get("pageToken").cloned();
    requests.lock().unwrap().push(params);
    Json(match token.as_deref() {
        None => json!({ "studies": [study(1), study(2), study(3)], "nextPageToken": "p2" }),
        Some("p2") => json!({ "studies": [study(4), study(5), study(6)], "nextPageToken": "p3" }),
        _ => json!({ "studies": [], "nextPageToken": "p4" }),
    })
}

async fn serve() -> (ClinicalTrialsClient, Requests) {
    let requests: Requests = Arc::default();
    let app = Router::new().route("/api/v2/studies", get(studies)).with_state(requests.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let cfg = FetchConfig {
        base_url: format!("http://{addr}/api/v2/studies"),
        ..Default::default()
    };
    (ClinicalTrialsClient::from_config(&cfg).unwrap(), requests)
}

fn param<'a>(req: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    req.get(key).map(String::as_str)
}

#[tokio::test]
async fn test_follows_next_page_token_and_caps_at_max_results() {
    let (client, requests) = serve().await;
    let studies = client.search("diabetes", 5).await.unwrap();

    assert_eq!(studies.len(), 5);
    let ids: Vec<_> = studies.iter().filter_map(|s| s.nct_id.as_deref()).collect();
    assert_eq!(ids, vec!["NCT00000001", "NCT00000002", "NCT00000003", "NCT00000004", "NCT00000005"]);

    let requests = requests.lock().unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(param(&requests[0], "query.cond"), Some("diabetes"));
    assert_eq!(param(&requests[0], "pageSize"), Some("5"));
    assert_eq!(param(&requests[0], "pageToken"), None);
    // the second page only asks for what is still missing
    assert_eq!(param(&requests[1], "pageToken"), Some("p2"));
    assert_eq!(param(&requests[1], "pageSize"), Some("2"));
}

#[tokio::test]
async fn test_stops_on_empty_page() {
    let (client, requests) = serve().await;
    let studies = client.search("diabetes", 100).await.unwrap();

    assert_eq!(studies.len(), 6);
    let requests = requests.lock().unwrap();
    assert_eq!(requests.len(), 3);
    assert_eq!(param(&requests[2], "pageToken"), Some("p3"));
}

#[tokio::test]
async fn test_page_size_never_exceeds_api_limit() {
    let (client, requests) = serve().await;
    client.search("cancer", 2500).await.unwrap();

    let requests = requests.lock().unwrap();
    assert!(requests
        .iter()
        .all(|r| param(r, "pageSize").and_then(|s| s.parse::<usize>().ok()).is_some_and(|n| n <= 1000)));
    assert_eq!(param(&requests[0], "pageSize"), Some("1000"));
}
