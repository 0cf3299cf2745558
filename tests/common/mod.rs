#![allow(dead_code)]

use lm_access::services::logger::{LogLevel, Logger};
use lm_access::services::observer::{RequestEvent, RequestObserver};
use lm_access::{ClientConfig, LmClient};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::io::Read;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tiny_http::{Header, Response, Server, StatusCode};

pub static ENV_LOCK: Lazy<tokio::sync::Mutex<()>> = Lazy::new(|| tokio::sync::Mutex::new(()));

pub const API_ROOT: &str = "/santaba/rest";

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: HashMap<String, String>,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    /// Path below the API root, e.g. `/device/devices`.
    pub fn api_path(&self) -> &str {
        self.path.strip_prefix(API_ROOT).unwrap_or(&self.path)
    }
}

#[derive(Debug, Clone)]
pub struct StubResponse {
    pub status: u16,
    pub body: String,
    pub headers: Vec<(String, String)>,
    pub delay: Option<Duration>,
}

impl StubResponse {
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Self {
            status,
            body: body.to_string(),
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            delay: None,
        }
    }

    pub fn raw(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            headers: Vec::new(),
            delay: None,
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

type Handler = dyn Fn(&RecordedRequest) -> StubResponse + Send + Sync;

/// Local HTTP server that answers from a closure and records every request.
pub struct StubServer {
    server: Arc<Server>,
    handle: Option<thread::JoinHandle<()>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    base: String,
}

impl StubServer {
    pub fn start<F>(handler: F) -> Self
    where
        F: Fn(&RecordedRequest) -> StubResponse + Send + Sync + 'static,
    {
        let server = Arc::new(Server::http("127.0.0.1:0").expect("stub server"));
        let addr = server.server_addr().to_ip().expect("ip listener");
        let requests = Arc::new(Mutex::new(Vec::new()));
        let handler: Arc<Handler> = Arc::new(handler);

        let worker_server = server.clone();
        let worker_requests = requests.clone();
        let handle = thread::spawn(move || {
            for mut request in worker_server.incoming_requests() {
                let mut body = String::new();
                let _ = request.as_reader().read_to_string(&mut body);
                let parsed = url::Url::parse(&format!("http://stub{}", request.url()))
                    .expect("request url");
                let recorded = RecordedRequest {
                    method: request.method().as_str().to_string(),
                    path: parsed.path().to_string(),
                    query: parsed
                        .query_pairs()
                        .map(|(k, v)| (k.into_owned(), v.into_owned()))
                        .collect(),
                    headers: request
                        .headers()
                        .iter()
                        .map(|h| {
                            (
                                h.field.as_str().as_str().to_ascii_lowercase(),
                                h.value.as_str().to_string(),
                            )
                        })
                        .collect(),
                    body,
                };
                worker_requests
                    .lock()
                    .expect("requests")
                    .push(recorded.clone());

                let reply = handler(&recorded);
                if let Some(delay) = reply.delay {
                    thread::sleep(delay);
                }
                let mut response =
                    Response::from_string(reply.body).with_status_code(StatusCode(reply.status));
                for (name, value) in &reply.headers {
                    response.add_header(
                        Header::from_bytes(name.as_bytes(), value.as_bytes()).expect("header"),
                    );
                }
                let _ = request.respond(response);
            }
        });

        Self {
            server,
            handle: Some(handle),
            requests,
            base: format!("http://{}", addr),
        }
    }

    pub fn api_base(&self) -> String {
        format!("{}{}", self.base, API_ROOT)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("requests").clone()
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig::new("acme", "lmb_test_token").with_base_url(self.api_base())
    }

    pub fn client(&self) -> LmClient {
        self.client_with(self.config(), None)
    }

    pub fn client_with(
        &self,
        config: ClientConfig,
        observer: Option<Arc<dyn RequestObserver>>,
    ) -> LmClient {
        let mut builder = LmClient::builder(config).logger(quiet_logger());
        if let Some(observer) = observer {
            builder = builder.observer(observer);
        }
        builder.build().expect("client")
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

pub fn quiet_logger() -> Logger {
    Logger::with_level("test", LogLevel::Error)
}

/// Collects every event it sees.
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<RequestEvent>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<RequestEvent> {
        self.events.lock().expect("events").clone()
    }

    pub fn phases(&self) -> Vec<&'static str> {
        self.events().iter().map(RequestEvent::phase).collect()
    }
}

impl RequestObserver for RecordingObserver {
    fn on_event(&self, event: &RequestEvent) {
        self.events.lock().expect("events").push(event.clone());
    }
}
