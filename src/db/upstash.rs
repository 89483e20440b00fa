use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;

use super::KvBackend;
use crate::error::KvError;

/// Upstash-compatible REST API, as exposed by Vercel KV.
pub struct UpstashKv {
    client: Client,
    base_url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct UpstashResponse {
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

impl UpstashKv {
    pub fn new(base_url: &str, token: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.to_string(),
            token: token.to_string(),
        }
    }

    fn command_url(&self, command: &str, key: &str) -> Result<Url, KvError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| KvError::Request(format!("invalid KV URL '{}': {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| KvError::Request(format!("KV URL '{}' cannot take a path", self.base_url)))?
            .pop_if_empty()
            .push(command)
            .push(key);
        Ok(url)
    }

    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<Option<serde_json::Value>, KvError> {
        let resp = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| KvError::Request(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| KvError::Request(e.to_string()))?;

        let parsed: UpstashResponse = serde_json::from_str(&body).map_err(|_| {
            KvError::Backend(format!("unexpected KV response ({}): {}", status, body))
        })?;

        if let Some(err) = parsed.error {
            return Err(KvError::Backend(err));
        }
        if !status.is_success() {
            return Err(KvError::Backend(format!("KV returned HTTP {}", status)));
        }
        Ok(parsed.result)
    }
}

#[async_trait]
impl KvBackend for UpstashKv {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let url = self.command_url("get", key)?;
        match self.execute(self.client.get(url)).await? {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(serde_json::Value::String(s)) => Ok(Some(s)),
            Some(other) => Err(KvError::Backend(format!(
                "expected a string value for '{}', got {}",
                key, other
            ))),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), KvError> {
        let url = self.command_url("set", key)?;
        self.execute(self.client.post(url).body(value.to_string()))
            .await?;
        Ok(())
    }
}
