#![allow(dead_code)]

use async_trait::async_trait;
use gator_client::{AvailablePackageCache, CondaApi, EnvironmentClient};
use gator_config::ClientSettings;
use gator_infra::{HttpRequest, HttpResponse, Transport, TransportError};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{watch, Notify};

pub const BASE_URL: &str = "http://localhost:8888/";
pub const POLL: Duration = Duration::from_millis(10);

#[derive(Clone)]
pub enum Reply {
    Respond(HttpResponse),
    /// Answer only once the gate is notified.
    Hold(Arc<Notify>, HttpResponse),
    Fail(String),
}

struct Rule {
    method: Method,
    target: String,
    reply: Reply,
    repeat: bool,
}

/// In-memory backend. Requests are matched against `path?query` in rule
/// order; one-shot rules are consumed, unmatched requests get a 404.
pub struct ScriptedTransport {
    rules: Mutex<Vec<Rule>>,
    requests: Mutex<Vec<HttpRequest>>,
    seen: watch::Sender<usize>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        let (seen, _) = watch::channel(0);
        Arc::new(Self {
            rules: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
            seen,
        })
    }

    pub fn on(&self, method: Method, target: &str, reply: Reply) {
        self.push_rule(method, target, reply, false);
    }

    pub fn always(&self, method: Method, target: &str, reply: Reply) {
        self.push_rule(method, target, reply, true);
    }

    fn push_rule(&self, method: Method, target: &str, reply: Reply, repeat: bool) {
        self.rules.lock().unwrap().push(Rule {
            method,
            target: target.to_string(),
            reply,
            repeat,
        });
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// `(METHOD, path?query)` of every request so far.
    pub fn log(&self) -> Vec<(Method, String)> {
        self.requests()
            .iter()
            .map(|r| (r.method.clone(), target_of(r)))
            .collect()
    }

    pub fn count(&self, method: Method, target: &str) -> usize {
        self.log()
            .into_iter()
            .filter(|(m, t)| *m == method && t == target)
            .count()
    }

    pub async fn wait_for_requests(&self, n: usize) {
        let mut rx = self.seen.subscribe();
        tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|count| *count >= n))
            .await
            .expect("timed out waiting for requests")
            .expect("transport dropped");
    }

    pub async fn wait_for(&self, method: Method, target: &str) {
        let mut rx = self.seen.subscribe();
        let wait = async {
            loop {
                if self.count(method.clone(), target) > 0 {
                    return;
                }
                rx.changed().await.expect("transport dropped");
            }
        };
        tokio::time::timeout(Duration::from_secs(5), wait)
            .await
            .expect("timed out waiting for request");
    }

    fn take_reply(&self, request: &HttpRequest) -> Option<Reply> {
        let target = target_of(request);
        let mut rules = self.rules.lock().unwrap();
        let pos = rules
            .iter()
            .position(|r| r.method == request.method && r.target == target)?;
        if rules[pos].repeat {
            Some(rules[pos].reply.clone())
        } else {
            Some(rules.remove(pos).reply)
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let reply = self.take_reply(&request);
        self.requests.lock().unwrap().push(request);
        self.seen.send_modify(|count| *count += 1);

        match reply {
            Some(Reply::Respond(response)) => Ok(response),
            Some(Reply::Hold(gate, response)) => {
                gate.notified().await;
                Ok(response)
            }
            Some(Reply::Fail(message)) => Err(TransportError(message)),
            None => Ok(HttpResponse::new(
                StatusCode::NOT_FOUND,
                r#"{"error":"no route"}"#,
            )),
        }
    }
}

fn target_of(request: &HttpRequest) -> String {
    match request.url.query() {
        Some(q) => format!("{}?{}", request.url.path(), q),
        None => request.url.path().to_string(),
    }
}

pub fn ok(body: Value) -> Reply {
    Reply::Respond(HttpResponse::new(StatusCode::OK, body.to_string()))
}

pub fn ok_text(body: &str) -> Reply {
    Reply::Respond(HttpResponse::new(StatusCode::OK, body.to_string()))
}

pub fn accepted(location: &str) -> Reply {
    Reply::Respond(HttpResponse::accepted(location))
}

pub fn server_error(message: &str) -> Reply {
    let body = serde_json::json!({ "error": message });
    Reply::Respond(HttpResponse::new(
        StatusCode::INTERNAL_SERVER_ERROR,
        body.to_string(),
    ))
}

pub fn api(transport: Arc<ScriptedTransport>) -> Arc<CondaApi> {
    Arc::new(CondaApi::new(transport, BASE_URL, POLL).unwrap())
}

pub fn client_with(transport: Arc<ScriptedTransport>, settings: ClientSettings) -> EnvironmentClient {
    EnvironmentClient::new(
        api(transport),
        settings,
        Arc::new(AvailablePackageCache::new()),
    )
}

pub fn client(transport: Arc<ScriptedTransport>) -> EnvironmentClient {
    client_with(transport, ClientSettings::default())
}

pub fn body_of(request: &HttpRequest) -> Value {
    request.body.clone().unwrap_or(Value::Null)
}
