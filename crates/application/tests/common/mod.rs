//! In-memory API server and push source shared by the integration tests.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::channel::mpsc;
use harvest_application::ports::{
    HttpMethod, HttpTransport, PushSource, PushStream, TransportError, TransportRequest,
    TransportResponse,
};
use harvest_application::{HarvestClient, SessionStore, SyncError};
use harvest_domain::{JobStatus, PushMessage, Session};
use serde_json::{Value, json};

/// What the refresh endpoint answers.
#[derive(Debug, Clone)]
pub enum RefreshBehavior {
    /// Grant this access credential.
    Grant(String),
    /// Answer with this status.
    Reject(u16),
}

/// A scripted API server.
pub struct FakeServer {
    valid_token: Mutex<String>,
    refresh: Mutex<RefreshBehavior>,
    refresh_delay: Duration,
    latency: Mutex<Duration>,
    page_size: Mutex<Option<usize>>,
    jobs: Mutex<BTreeMap<String, Value>>,
    requests: Mutex<Vec<TransportRequest>>,
    refresh_calls: AtomicUsize,
    reject_everything: AtomicBool,
    offline: AtomicBool,
}

impl FakeServer {
    /// Server that accepts `access-2` and refreshes to it.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            valid_token: Mutex::new("access-2".to_string()),
            refresh: Mutex::new(RefreshBehavior::Grant("access-2".to_string())),
            refresh_delay: Duration::from_millis(20),
            latency: Mutex::new(Duration::from_millis(1)),
            page_size: Mutex::new(None),
            jobs: Mutex::new(BTreeMap::new()),
            requests: Mutex::new(Vec::new()),
            refresh_calls: AtomicUsize::new(0),
            reject_everything: AtomicBool::new(false),
            offline: AtomicBool::new(false),
        })
    }

    /// Server that already accepts the client's `access-1`.
    pub fn accepting_current() -> Arc<Self> {
        let server = Self::new();
        server.set_valid_token("access-1");
        server
    }

    pub fn set_valid_token(&self, token: &str) {
        *self.valid_token.lock().unwrap() = token.to_string();
    }

    pub fn set_refresh(&self, behavior: RefreshBehavior) {
        *self.refresh.lock().unwrap() = behavior;
    }

    pub fn reject_everything(&self) {
        self.reject_everything.store(true, Ordering::SeqCst);
    }

    /// Delay before every answer.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = latency;
    }

    /// Makes the job list return only its first `size` entries.
    pub fn paginate(&self, size: usize) {
        *self.page_size.lock().unwrap() = Some(size);
    }

    pub fn go_offline(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }

    pub fn put_job(&self, id: &str, status: JobStatus, sequence: u64) {
        self.jobs.lock().unwrap().insert(
            id.to_string(),
            json!({
                "id": id,
                "url": format!("https://{id}.example.com"),
                "status": status.as_str(),
                "created_at": "2026-01-01T00:00:00Z",
                "options": {"mode": "full", "depth": 1},
                "sequence": sequence,
            }),
        );
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of GET requests whose path (without query) equals `path`.
    pub fn gets(&self, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == HttpMethod::Get && strip_query(&r.path) == path)
            .count()
    }

    /// Number of job poll requests (list and single job).
    pub fn job_polls(&self) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == HttpMethod::Get && r.path.starts_with("/api/jobs/"))
            .count()
    }

    fn authorized(&self, request: &TransportRequest) -> bool {
        if self.reject_everything.load(Ordering::SeqCst) {
            return false;
        }
        let expected = format!("Bearer {}", self.valid_token.lock().unwrap());
        request.header("authorization") == Some(expected.as_str())
    }

    async fn refresh(&self, request: &TransportRequest) -> TransportResponse {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.refresh_delay).await;
        assert_eq!(
            request.body.as_ref().and_then(|b| b.get("refresh")).and_then(Value::as_str),
            Some("refresh-1")
        );
        let behavior = self.refresh.lock().unwrap().clone();
        match behavior {
            RefreshBehavior::Grant(access) => {
                self.set_valid_token(&access);
                TransportResponse::json(200, &json!({ "access": access }))
            }
            RefreshBehavior::Reject(status) => {
                TransportResponse::json(status, &json!({"detail": "Token is invalid or expired"}))
            }
        }
    }

    fn route(&self, request: &TransportRequest) -> TransportResponse {
        let path = strip_query(&request.path);
        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
        match (request.method, segments.as_slice()) {
            (HttpMethod::Post, ["api", "auth", "login"]) => {
                let body = request.body.clone().unwrap_or_default();
                if body["password"] == "secret" {
                    TransportResponse::json(200, &json!({"access": "access-1", "refresh": "refresh-1"}))
                } else {
                    TransportResponse::json(401, &json!({"detail": "No active account"}))
                }
            }
            (HttpMethod::Post, ["api", "auth", "register"]) => {
                let username = request.body.clone().unwrap_or_default()["username"].clone();
                TransportResponse::json(
                    201,
                    &json!({
                        "access": "access-1",
                        "refresh": "refresh-1",
                        "user": {"id": 7, "username": username},
                    }),
                )
            }
            _ if !self.authorized(request) => {
                TransportResponse::json(401, &json!({"detail": "Given token not valid"}))
            }
            (HttpMethod::Get, ["api", "auth", "me"]) => TransportResponse::json(
                200,
                &json!({"id": 7, "username": "ann", "email": "ann@example.com"}),
            ),
            (HttpMethod::Get, ["api", "jobs", "statistics"]) => {
                let total = self.jobs.lock().unwrap().len();
                TransportResponse::json(200, &json!({"total": total}))
            }
            (HttpMethod::Get, ["api", "jobs"]) => {
                let jobs: Vec<Value> = self.jobs.lock().unwrap().values().cloned().collect();
                let count = jobs.len();
                let size = self.page_size.lock().unwrap().unwrap_or(count);
                let next = (count > size).then_some("http://testserver/api/jobs/?page=2");
                let page: Vec<Value> = jobs.into_iter().take(size).collect();
                TransportResponse::json(
                    200,
                    &json!({"count": count, "next": next, "results": page}),
                )
            }
            (HttpMethod::Post, ["api", "jobs"]) => {
                let url = request.body.clone().unwrap_or_default()["url"].clone();
                let id = format!("new-{}", self.jobs.lock().unwrap().len() + 1);
                let job = json!({"id": id, "url": url, "status": "pending", "sequence": 1});
                self.jobs.lock().unwrap().insert(id, job.clone());
                TransportResponse::json(201, &job)
            }
            (HttpMethod::Get, ["api", "jobs", id]) => match self.jobs.lock().unwrap().get(*id) {
                Some(job) => TransportResponse::json(200, job),
                None => TransportResponse::json(404, &json!({"detail": "Not found."})),
            },
            (HttpMethod::Get, ["api", "jobs", _, "result"]) => {
                TransportResponse::json(404, &json!({"detail": "Result not available yet."}))
            }
            (HttpMethod::Post, ["api", "jobs", id, "retry"]) => {
                let mut jobs = self.jobs.lock().unwrap();
                match jobs.get_mut(*id) {
                    Some(job) => {
                        let sequence = job["sequence"].as_u64().unwrap_or(0) + 1;
                        job["status"] = json!("pending");
                        job["sequence"] = json!(sequence);
                        TransportResponse::json(200, job)
                    }
                    None => TransportResponse::json(404, &json!({"detail": "Not found."})),
                }
            }
            (HttpMethod::Get, ["api", "results", _, "export"]) => {
                let mut response = TransportResponse::new(200, "id,url\n1,https://a.example.com\n");
                response
                    .headers
                    .insert("content-type".to_string(), "text/csv".to_string());
                response
            }
            _ => TransportResponse::json(404, &json!({"detail": "Not found."})),
        }
    }
}

#[async_trait]
impl HttpTransport for FakeServer {
    async fn execute(&self, request: &TransportRequest) -> Result<TransportResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        if self.offline.load(Ordering::SeqCst) {
            return Err(TransportError::ConnectionFailed("connection refused".to_string()));
        }
        let latency = *self.latency.lock().unwrap();
        tokio::time::sleep(latency).await;
        if request.path == "/api/auth/refresh/" {
            return Ok(self.refresh(request).await);
        }
        Ok(self.route(request))
    }
}

fn strip_query(path: &str) -> &str {
    path.split('?').next().unwrap_or(path)
}

/// Push source whose connections are opened by the test.
#[derive(Default)]
pub struct ScriptedPush {
    pending: Mutex<VecDeque<mpsc::UnboundedReceiver<Result<PushMessage, SyncError>>>>,
    connects: AtomicUsize,
}

impl ScriptedPush {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Makes the next connect attempt succeed; returns its sending side.
    pub fn accept_next(&self) -> mpsc::UnboundedSender<Result<PushMessage, SyncError>> {
        let (sender, receiver) = mpsc::unbounded();
        self.pending.lock().unwrap().push_back(receiver);
        sender
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PushSource for ScriptedPush {
    async fn connect(&self, access_token: Option<String>) -> Result<PushStream, SyncError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        assert!(access_token.is_some(), "push connections must be authorised");
        match self.pending.lock().unwrap().pop_front() {
            Some(receiver) => Ok(Box::pin(receiver)),
            None => Err(SyncError::Connect("connection refused".to_string())),
        }
    }
}

/// A client signed in with `access-1` / `refresh-1`.
pub fn signed_in_client(server: &Arc<FakeServer>) -> HarvestClient {
    let session = SessionStore::in_memory(Session::new(
        "access-1".to_string(),
        Some("refresh-1".to_string()),
        None,
    ));
    HarvestClient::new(server.clone(), Arc::new(session))
}

/// A client with no session.
pub fn signed_out_client(server: &Arc<FakeServer>) -> HarvestClient {
    HarvestClient::new(server.clone(), Arc::new(SessionStore::default()))
}
