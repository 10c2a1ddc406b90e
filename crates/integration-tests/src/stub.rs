//! Stub of the remote recommender API served over real HTTP.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::Router;
use axum::extract::State;
use axum::http::{Method, StatusCode, Uri, header};
use recommender_core::Product;
use tokio::task::JoinHandle;

/// A request received by the stub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: Method,
    /// Path exactly as sent, still percent-encoded.
    pub path: String,
    pub query: Option<String>,
    pub body: String,
}

#[derive(Default)]
struct StubState {
    requests: Mutex<Vec<RecordedRequest>>,
    /// Canned responses keyed by request path.
    responses: Mutex<HashMap<String, (StatusCode, String)>>,
}

impl StubState {
    fn requests(&self) -> MutexGuard<'_, Vec<RecordedRequest>> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn responses(&self) -> MutexGuard<'_, HashMap<String, (StatusCode, String)>> {
        self.responses.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Recommender API stub bound to an ephemeral port on 127.0.0.1.
///
/// Every request is recorded. Paths without a canned response get `404`,
/// except `POST .../track`, which is accepted by default.
pub struct StubApi {
    addr: SocketAddr,
    state: Arc<StubState>,
    server: JoinHandle<()>,
}

impl StubApi {
    /// Start the stub.
    ///
    /// # Errors
    ///
    /// Returns error if no local port can be bound.
    pub async fn start() -> std::io::Result<Self> {
        let state = Arc::new(StubState::default());
        let app = Router::new().fallback(answer).with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            addr,
            state,
            server,
        })
    }

    /// API base URL to configure the client with.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    /// Answer requests for `path` with `status` and `body`.
    pub fn respond(&self, path: &str, status: StatusCode, body: impl Into<String>) {
        self.state
            .responses()
            .insert(path.to_string(), (status, body.into()));
    }

    /// Answer `path` with `value` as JSON.
    pub fn respond_json(&self, path: &str, value: &serde_json::Value) {
        self.respond(path, StatusCode::OK, value.to_string());
    }

    /// Serve `products` at `/api/products`.
    pub fn serve_catalog(&self, products: &[Product]) {
        let body = serde_json::to_string(products).unwrap_or_default();
        self.respond("/api/products", StatusCode::OK, body);
    }

    /// Every request received so far, in arrival order.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests().clone()
    }

    /// Requests received for `path`.
    #[must_use]
    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }
}

impl Drop for StubApi {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn answer(
    State(state): State<Arc<StubState>>,
    method: Method,
    uri: Uri,
    body: String,
) -> (StatusCode, [(header::HeaderName, &'static str); 1], String) {
    let path = uri.path().to_string();
    let is_track = method == Method::POST && path.ends_with("/track");

    state.requests().push(RecordedRequest {
        method,
        path: path.clone(),
        query: uri.query().map(str::to_string),
        body,
    });

    let (status, body) = state.responses().get(&path).cloned().unwrap_or_else(|| {
        if is_track {
            (StatusCode::OK, r#"{"status":"tracked"}"#.to_string())
        } else {
            (StatusCode::NOT_FOUND, r#"{"error":"not found"}"#.to_string())
        }
    });

    (status, [(header::CONTENT_TYPE, "application/json")], body)
}
