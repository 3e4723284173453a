use anyhow::Result;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use postwheel::db;
use postwheel::http::{build_router, AppState};
use postwheel::model::{ContentSelection, RenderedImages};
use postwheel::render::Renderer;
use postwheel::storage::AssetStore;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

struct StubRenderer;

#[async_trait]
impl Renderer for StubRenderer {
    async fn render(&self, _selection: &ContentSelection) -> Result<RenderedImages> {
        Ok(RenderedImages {
            quote_card: b"q".to_vec(),
            value_name_card: b"n".to_vec(),
            value_description_card: b"d".to_vec(),
        })
    }
}

struct StubStore;

#[async_trait]
impl AssetStore for StubStore {
    async fn upload(&self, _: &str, _: &[u8], _: &str, _: &str) -> Result<()> {
        Ok(())
    }

    async fn remove(&self, _: &str) -> Result<()> {
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("https://cdn.test/{}", key)
    }
}

async fn setup_state() -> AppState {
    let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    AppState {
        pool,
        renderer: Arc::new(StubRenderer),
        store: Arc::new(StubStore),
        key_prefix: "rotations".into(),
    }
}

async fn body_json(res: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn get_rotate_is_descriptive_and_inert() {
    let state = setup_state().await;
    let app = build_router(state.clone());

    let res = app
        .oneshot(Request::get("/api/rotate").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["success"], true);
    assert!(body["message"].as_str().unwrap().contains("POST"));

    // No rotation happened.
    assert!(db::get_scheduled_post(&state.pool).await.unwrap().is_none());
}

#[tokio::test]
async fn post_rotate_on_empty_queue_is_conflict() {
    let state = setup_state().await;
    let app = build_router(state);

    let res = app
        .oneshot(Request::post("/api/rotate").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body = body_json(res).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Queue is empty");
}

#[tokio::test]
async fn post_rotate_then_read_back_current_post() {
    let state = setup_state().await;
    let cv = db::insert_core_value(&state.pool, "Craft", "Do fewer things, better.")
        .await
        .unwrap();
    let q = db::insert_quote(&state.pool, "make it sing", "A. Writer")
        .await
        .unwrap();
    let mut tx = state.pool.begin().await.unwrap();
    db::append_queue_entry(&mut tx, &cv, &q, 1).await.unwrap();
    tx.commit().await.unwrap();

    let app = build_router(state.clone());

    let res = app
        .clone()
        .oneshot(Request::get("/api/posts/current").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = app
        .clone()
        .oneshot(Request::post("/api/rotate").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["quote_id"], q.as_str());

    let res = app
        .clone()
        .oneshot(Request::get("/api/posts/current").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["data"]["status"], "Pending");
    assert!(body["data"]["payload"]["caption"]
        .as_str()
        .unwrap()
        .contains("make it sing"));

    let res = app
        .oneshot(Request::get("/api/queue").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    // The consumed quote left the queue, so it was eligible again and the
    // queue was replenished back to one entry.
    let entries = body["data"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["queue_position"], "01");
}
