//! Transport (spec.md §4.C) — the single authenticated HTTP client.
//!
//! Builds and signs requests, executes with bounded retry on transient
//! network errors, and unwraps the exchange's `{code, msg, data}` envelope.

use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::signer::Signer;

const BASE_URL: &str = "https://www.okx.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_ATTEMPTS: u32 = 3;

#[derive(Deserialize)]
struct Envelope {
    code: String,
    msg: String,
    #[serde(default)]
    data: Value,
}

/// Owns the HTTP client and credentials; safe for concurrent use (`reqwest::Client`
/// clones share a connection pool, and nothing here is mutated after construction).
pub struct Transport {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    passphrase: String,
    signer: Signer,
    testnet: bool,
}

impl Transport {
    pub fn new(api_key: String, api_secret: String, passphrase: String, testnet: bool) -> Self {
        Self::with_base_url(BASE_URL.to_string(), api_key, api_secret, passphrase, testnet)
    }

    /// Same as `new`, but targeting an arbitrary base URL. Used by integration
    /// tests to point the client at a `mockito` stub server; production callers
    /// should always use `new`, since spec.md §9 keeps the host fixed regardless
    /// of `testnet`.
    pub fn with_base_url(
        base_url: String,
        api_key: String,
        api_secret: String,
        passphrase: String,
        testnet: bool,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("reqwest client config is valid");

        Self {
            client,
            base_url,
            api_key,
            passphrase,
            signer: Signer::new(api_secret),
            testnet,
        }
    }

    /// Execute `method path` with an optional JSON body, returning the raw
    /// `data` field of the exchange envelope.
    pub async fn request(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value> {
        let body_str = match body {
            Some(v) => serde_json::to_string(v)?,
            None => String::new(),
        };

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.try_once(method.clone(), path, &body_str).await {
                Ok(value) => return Ok(value),
                Err(Error::Transport(text)) if Error::is_retryable_text(&text) => {
                    if attempt >= MAX_ATTEMPTS {
                        warn!("transport error exhausted {MAX_ATTEMPTS} attempts: {text}");
                        return Err(Error::Transport(format!(
                            "请求失败（已重试{}次）",
                            MAX_ATTEMPTS
                        )));
                    }
                    let backoff = Duration::from_secs(attempt as u64);
                    debug!(
                        attempt,
                        max_attempts = MAX_ATTEMPTS,
                        "transport error: {text} — retrying in {}s",
                        backoff.as_secs()
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(other) => return Err(other),
            }
        }
    }

    async fn try_once(&self, method: Method, path: &str, body_str: &str) -> Result<Value> {
        let timestamp = Signer::timestamp_now();
        let signature = self.signer.sign(&timestamp, method.as_str(), path, body_str);
        let url = format!("{}{path}", self.base_url);

        let mut req = self
            .client
            .request(method, &url)
            .header("Content-Type", "application/json")
            .header("OK-ACCESS-KEY", &self.api_key)
            .header("OK-ACCESS-SIGN", signature)
            .header("OK-ACCESS-TIMESTAMP", &timestamp)
            .header("OK-ACCESS-PASSPHRASE", &self.passphrase);

        if self.testnet {
            req = req.header("x-simulated-trading", "1");
        }
        if !body_str.is_empty() {
            req = req.body(body_str.to_string());
        }

        let resp = req.send().await.map_err(|e| classify_reqwest_error(&e))?;
        let status = resp.status();
        let text = resp.text().await.map_err(|e| classify_reqwest_error(&e))?;

        if status != StatusCode::OK {
            if let Ok(env) = serde_json::from_str::<Envelope>(&text) {
                return Err(Error::Envelope { code: env.code, msg: env.msg });
            }
            return Err(Error::Http { status: status.as_u16(), body: text });
        }

        let env: Envelope = serde_json::from_str(&text)?;
        if env.code != "0" {
            return Err(Error::Envelope { code: env.code, msg: env.msg });
        }

        Ok(env.data)
    }
}

fn classify_reqwest_error(e: &reqwest::Error) -> Error {
    Error::Transport(e.to_string())
}
