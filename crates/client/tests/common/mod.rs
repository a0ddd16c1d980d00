//! In-process stub of the family API, backed by the in-memory member store.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use lineage_core::error::CoreError;
use lineage_core::member::{MemberPatch, MemberRef};
use lineage_core::memory::MemberSet;
use lineage_core::mutation;
use lineage_core::request::{AddMemberRequest, SpousePairRequest};
use lineage_core::tree::FamilyTree;
use serde_json::{json, Value};
use tokio::sync::Mutex;

#[derive(Clone, Default)]
pub struct Stub {
    pub members: Arc<Mutex<MemberSet>>,
    /// Every route answers 500.
    pub fail_all: Arc<AtomicBool>,
    /// Mutating routes answer 500.
    pub fail_mutations: Arc<AtomicBool>,
    pub tree_fetches: Arc<AtomicUsize>,
    /// Canned bio text; `None` makes the bio route answer 503.
    pub bio_text: Arc<std::sync::Mutex<Option<String>>>,
}

impl Stub {
    pub fn set_fail_all(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_mutations(&self, fail: bool) {
        self.fail_mutations.store(fail, Ordering::SeqCst);
    }

    pub fn tree_fetches(&self) -> usize {
        self.tree_fetches.load(Ordering::SeqCst)
    }

    fn refuse_mutation(&self) -> Option<Response> {
        (self.fail_all.load(Ordering::SeqCst) || self.fail_mutations.load(Ordering::SeqCst))
            .then(server_error)
    }
}

/// Serve `stub` on an ephemeral port. Returns the base URL of the server.
pub async fn spawn(stub: Stub) -> String {
    let app = Router::new()
        .route("/api/family", get(tree))
        .route("/api/family/members", post(add))
        .route("/api/family/members/{id}", put(update).delete(remove))
        .route("/api/family/link", post(link))
        .route("/api/family/unlink", post(unlink))
        .route("/v1beta/models/{call}", post(generate))
        .with_state(stub);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn server_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": "An internal error occurred", "code": "INTERNAL_ERROR"})),
    )
        .into_response()
}

fn core_error(err: CoreError) -> Response {
    let (status, code) = match err {
        CoreError::NotFound { .. } | CoreError::NoRoot => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        CoreError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
        CoreError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
        CoreError::RootInvariant(_) => (StatusCode::INTERNAL_SERVER_ERROR, "ROOT_INVARIANT_VIOLATION"),
        CoreError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
    };
    (status, Json(json!({"error": err.to_string(), "code": code}))).into_response()
}

fn data(status: StatusCode, value: impl serde::Serialize) -> Response {
    (status, Json(json!({ "data": value }))).into_response()
}

async fn tree(State(stub): State<Stub>) -> Response {
    stub.tree_fetches.fetch_add(1, Ordering::SeqCst);
    if stub.fail_all.load(Ordering::SeqCst) {
        return server_error();
    }
    let members = stub.members.lock().await.to_vec();
    if members.is_empty() {
        return data(StatusCode::OK, FamilyTree::placeholder().to_nested());
    }
    match FamilyTree::assemble(members) {
        Ok(tree) => data(StatusCode::OK, tree.to_nested()),
        Err(err) => core_error(err),
    }
}

async fn add(State(stub): State<Stub>, Json(input): Json<AddMemberRequest>) -> Response {
    if let Some(refused) = stub.refuse_mutation() {
        return refused;
    }
    let mut members = stub.members.lock().await;
    let mut tx = members.begin();
    match mutation::add_member(
        &mut *tx,
        input.parent_id,
        &input.member,
        input.should_link_spouse,
    )
    .await
    {
        Ok(outcome) => {
            tx.commit();
            data(StatusCode::CREATED, outcome.member)
        }
        Err(err) => core_error(err),
    }
}

async fn update(
    State(stub): State<Stub>,
    Path(id): Path<String>,
    Json(patch): Json<MemberPatch>,
) -> Response {
    if let Some(refused) = stub.refuse_mutation() {
        return refused;
    }
    let target: MemberRef = match id.parse() {
        Ok(target) => target,
        Err(err) => return core_error(err),
    };
    let mut members = stub.members.lock().await;
    let mut tx = members.begin();
    match mutation::update_member(&mut *tx, target, &patch).await {
        Ok(member) => {
            tx.commit();
            data(StatusCode::OK, member)
        }
        Err(err) => core_error(err),
    }
}

async fn remove(State(stub): State<Stub>, Path(id): Path<String>) -> Response {
    if let Some(refused) = stub.refuse_mutation() {
        return refused;
    }
    let target: MemberRef = match id.parse() {
        Ok(target) => target,
        Err(err) => return core_error(err),
    };
    let mut members = stub.members.lock().await;
    let mut tx = members.begin();
    match mutation::delete_member(&mut *tx, target).await {
        Ok(_) => {
            tx.commit();
            StatusCode::NO_CONTENT.into_response()
        }
        Err(err) => core_error(err),
    }
}

async fn link(State(stub): State<Stub>, Json(pair): Json<SpousePairRequest>) -> Response {
    if let Some(refused) = stub.refuse_mutation() {
        return refused;
    }
    let mut members = stub.members.lock().await;
    let mut tx = members.begin();
    match mutation::link_members(&mut *tx, pair.member_id1, pair.member_id2).await {
        Ok(_) => {
            tx.commit();
            StatusCode::NO_CONTENT.into_response()
        }
        Err(err) => core_error(err),
    }
}

async fn unlink(State(stub): State<Stub>, Json(pair): Json<SpousePairRequest>) -> Response {
    if let Some(refused) = stub.refuse_mutation() {
        return refused;
    }
    let mut members = stub.members.lock().await;
    let mut tx = members.begin();
    match mutation::unlink_members(&mut *tx, pair.member_id1, pair.member_id2).await {
        Ok(_) => {
            tx.commit();
            StatusCode::NO_CONTENT.into_response()
        }
        Err(err) => core_error(err),
    }
}

async fn generate(
    State(stub): State<Stub>,
    Path(call): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let has_key = headers.get("x-goog-api-key").is_some();
    let has_prompt = body["contents"][0]["parts"][0]["text"].is_string();
    if !call.ends_with(":generateContent") || !has_key || !has_prompt {
        return StatusCode::BAD_REQUEST.into_response();
    }
    let text = stub.bio_text.lock().unwrap().clone();
    match text {
        Some(text) => Json(json!({
            "candidates": [{ "content": { "parts": [{ "text": text }] } }]
        }))
        .into_response(),
        None => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}
