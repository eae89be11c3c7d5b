//! End-to-end tests of the listing API over the in-memory backend.
//!
//! Each test boots the router on an ephemeral port and talks to it with
//! `reqwest`.

#![allow(clippy::panic, clippy::indexing_slicing)]

use std::sync::Arc;

use axum::Router;
use chrono::Utc;
use reqwest::{StatusCode, Url};
use serde_json::Value;

use ledger_index::api;
use ledger_index::app_state::AppState;
use ledger_index::domain::{Amount, BurnLedgerEntry, Epoch, TxHash};
use ledger_index::service::IndexService;

async fn spawn_server(index: Arc<IndexService>) -> String {
    let app: Router = api::build_router().with_state(AppState::new(index, 2, 50));
    let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
        panic!("bind failed");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("no local addr");
    };
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

async fn seeded_epochs(count: u64) -> Arc<IndexService> {
    let index = IndexService::in_memory(6);
    for id in 1..=count {
        let epoch = Epoch::new(id, Utc::now(), Amount::new(1), Amount::ZERO, Amount::ZERO);
        let Ok(_) = index.epochs.upsert(epoch).await else {
            panic!("seed failed");
        };
    }
    Arc::new(index)
}

async fn get_json(url: &str, params: &[(&str, &str)]) -> (StatusCode, Value) {
    let Ok(url) = Url::parse_with_params(url, params) else {
        panic!("bad url {url}");
    };
    let Ok(response) = reqwest::get(url).await else {
        panic!("request failed");
    };
    let status = response.status();
    let Ok(body) = response.json::<Value>().await else {
        panic!("body is not JSON");
    };
    (status, body)
}

fn ids(page: &Value) -> Vec<u64> {
    page["data"]
        .as_array()
        .map(|data| data.iter().filter_map(|e| e["id"].as_u64()).collect())
        .unwrap_or_default()
}

#[tokio::test]
async fn health_reports_healthy() {
    let base = spawn_server(Arc::new(IndexService::in_memory(6))).await;
    let (status, body) = get_json(&format!("{base}/health"), &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn cursors_walk_the_listing_both_ways() {
    let base = spawn_server(seeded_epochs(7).await).await;
    let url = format!("{base}/api/v1/epochs");

    // Default page size is 2.
    let (status, first) = get_json(&url, &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&first), vec![7, 6]);
    assert_eq!(first["is_start"], true);
    assert_eq!(first["total"], 7);

    let mut seen = ids(&first);
    let mut page = first;
    while page["is_end"] != true {
        let Some(cursor) = page["last_cursor"].as_str().map(str::to_string) else {
            panic!("page without last_cursor");
        };
        let (status, next) = get_json(&url, &[("cursor", &cursor), ("count", "3")]).await;
        assert_eq!(status, StatusCode::OK);
        seen.extend(ids(&next));
        page = next;
    }
    assert_eq!(seen, vec![7, 6, 5, 4, 3, 2, 1]);

    // Back up from the bottom page.
    let Some(cursor) = page["first_cursor"].as_str().map(str::to_string) else {
        panic!("page without first_cursor");
    };
    let (_, above) = get_json(&url, &[("cursor", &cursor), ("count", "-2")]).await;
    assert_eq!(ids(&above), vec![4, 3]);
}

#[tokio::test]
async fn filter_scopes_total_and_page() {
    let base = spawn_server(seeded_epochs(9).await).await;
    let url = format!("{base}/api/v1/epochs");
    let filter = r#"[{"field":"id","op":"lte","value":4}]"#;
    let (status, page) = get_json(&url, &[("filter", filter), ("count", "10")]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&page), vec![4, 3, 2, 1]);
    assert_eq!(page["total"], 4);
    assert_eq!(page["is_end"], true);
    assert_eq!(page["filter"][0]["op"], "lte");
}

#[tokio::test]
async fn bad_requests_carry_error_codes() {
    let base = spawn_server(seeded_epochs(3).await).await;
    let url = format!("{base}/api/v1/epochs");

    let (status, body) = get_json(&url, &[("count", "0")]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], 1002);

    let (status, body) = get_json(&url, &[("cursor", "not-a-cursor")]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], 1001);

    let (status, body) = get_json(&url, &[("filter", r#"[{"field":"a b","op":"eq","value":1}]"#)])
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], 1003);

    let (status, body) = get_json(&format!("{base}/api/v1/burns/99"), &[]).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], 2001);
}

#[tokio::test]
async fn reconciled_burns_are_served() {
    let index = Arc::new(IndexService::in_memory(6));
    for (amount, tx) in [(5u128, 0xAu8), (3, 0xB), (5, 0xA)] {
        let Ok(burn) = BurnLedgerEntry::new(10, Amount::new(amount), [TxHash::from_bytes([tx; 32])])
        else {
            panic!("burn should build");
        };
        let Ok(_) = index.reconciler.merge_burn(burn).await else {
            panic!("burn should reconcile");
        };
    }
    let base = spawn_server(Arc::clone(&index)).await;

    let (status, entry) = get_json(&format!("{base}/api/v1/burns/10"), &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(entry["amount"], "8");
    assert_eq!(entry["tx_list"].as_array().map(Vec::len), Some(2));

    let (_, page) = get_json(&format!("{base}/api/v1/burns"), &[]).await;
    assert_eq!(page["total"], 1);
}

#[test]
fn in_memory_service_starts_empty() {
    let index = IndexService::in_memory(6);
    let page = tokio_test::block_on(index.burns.list(Default::default(), None, 5));
    let Ok(page) = page else {
        panic!("list should succeed");
    };
    assert!(page.is_empty() && page.is_start && page.is_end);
}
