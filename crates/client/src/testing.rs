//! Scripted network and fixtures shared by the in-crate tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use tokio::sync::watch;
use url::Url;

use shellcache_core::{AppConfig, Error, RequestDescriptor, ResponseSnapshot};

use crate::fetch::Network;

#[derive(Clone)]
enum Reply {
    Respond(ResponseSnapshot),
    Fail,
}

/// In-memory [`Network`]. Unscripted URLs fail as if offline.
pub(crate) struct StubNetwork {
    replies: Mutex<HashMap<String, Reply>>,
    calls: Mutex<Vec<String>>,
    gate: watch::Sender<bool>,
}

impl StubNetwork {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self { replies: Mutex::new(HashMap::new()), calls: Mutex::new(Vec::new()), gate: watch::Sender::new(true) })
    }

    pub(crate) fn respond(&self, url: &str, status: u16, body: &'static str) {
        self.replies
            .lock()
            .unwrap()
            .insert(url.to_string(), Reply::Respond(snapshot(url, status, body)));
    }

    pub(crate) fn fail(&self, url: &str) {
        self.replies.lock().unwrap().insert(url.to_string(), Reply::Fail);
    }

    /// Hold every fetch until [`StubNetwork::open_gate`] is called.
    pub(crate) fn close_gate(&self) {
        self.gate.send_replace(false);
    }

    pub(crate) fn open_gate(&self) {
        self.gate.send_replace(true);
    }

    pub(crate) fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl Network for StubNetwork {
    async fn fetch(&self, request: &RequestDescriptor) -> Result<ResponseSnapshot, Error> {
        let url = request.url().to_string();
        self.calls.lock().unwrap().push(url.clone());

        let mut gate = self.gate.subscribe();
        let _ = gate.wait_for(|open| *open).await;

        let reply = self.replies.lock().unwrap().get(&url).cloned();
        match reply {
            Some(Reply::Respond(snapshot)) => Ok(snapshot),
            Some(Reply::Fail) | None => Err(Error::Network(format!("unreachable: {url}"))),
        }
    }
}

pub(crate) fn snapshot(url: &str, status: u16, body: &'static str) -> ResponseSnapshot {
    ResponseSnapshot {
        url: url.to_string(),
        status,
        status_text: String::new(),
        headers: vec![("content-type".into(), "text/plain".into()), ("x-origin".into(), "stub".into())],
        body: Bytes::from_static(body.as_bytes()),
        stored_at: None,
    }
}

pub(crate) fn get(url: &str) -> RequestDescriptor {
    RequestDescriptor::get(Url::parse(url).unwrap())
}

pub(crate) fn app_config() -> AppConfig {
    AppConfig { app_origin: "https://app.example".into(), app_name: "Ledger".into(), ..Default::default() }
}
