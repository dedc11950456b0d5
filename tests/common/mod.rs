//! Shared fake transport: canned JSON responses per URL plus call
//! recording, so tests can assert how often each endpoint is hit.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use bili_monitor::client::session::BiliHttp;
use bili_monitor::client::BiliError;

#[derive(Default)]
pub struct FakeHttp {
    cookies: Mutex<HashMap<String, String>>,
    calls: Mutex<Vec<(String, Vec<(String, String)>)>>,
    responses: Mutex<HashMap<String, VecDeque<Value>>>,
}

impl FakeHttp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_response(&self, url: &str, payload: Value) {
        self.responses
            .lock()
            .expect("responses lock")
            .entry(url.to_string())
            .or_default()
            .push_back(payload);
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls
            .lock()
            .expect("calls lock")
            .iter()
            .filter(|(called, _)| called == url)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().expect("calls lock").len()
    }

    pub fn last_params(&self, url: &str) -> Option<Vec<(String, String)>> {
        self.calls
            .lock()
            .expect("calls lock")
            .iter()
            .rev()
            .find(|(called, _)| called == url)
            .map(|(_, params)| params.clone())
    }

    fn serve(&self, url: &str, params: &[(String, String)]) -> Result<Value, BiliError> {
        self.calls
            .lock()
            .expect("calls lock")
            .push((url.to_string(), params.to_vec()));
        self.responses
            .lock()
            .expect("responses lock")
            .get_mut(url)
            .and_then(|queue| queue.pop_front())
            .ok_or_else(|| BiliError::Payload(format!("no canned response for {url}")))
    }
}

#[async_trait]
impl BiliHttp for FakeHttp {
    async fn get_json(
        &self,
        url: &str,
        params: &[(String, String)],
        _headers: &[(&'static str, String)],
    ) -> Result<Value, BiliError> {
        self.serve(url, params)
    }

    async fn post_json(
        &self,
        url: &str,
        params: &[(String, String)],
        _body: Option<String>,
        _headers: &[(&'static str, String)],
    ) -> Result<Value, BiliError> {
        self.serve(url, params)
    }

    fn cookie(&self, name: &str) -> Option<String> {
        self.cookies.lock().expect("cookies lock").get(name).cloned()
    }

    fn set_cookie(&self, name: &str, value: &str) {
        self.cookies
            .lock()
            .expect("cookies lock")
            .insert(name.to_string(), value.to_string());
    }
}
