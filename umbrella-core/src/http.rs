use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::{fmt::Debug, time::Duration};

use crate::error::FetchError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Minimal GET-and-decode transport used by the fetcher.
#[async_trait]
pub trait HttpClient: Send + Sync + Debug {
    async fn get_json(&self, url: &str) -> Result<Value, FetchError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestClient {
    http: Client,
}

impl ReqwestClient {
    pub fn new() -> Result<Self, FetchError> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get_json(&self, url: &str) -> Result<Value, FetchError> {
        tracing::debug!(url, "GET");

        let res = self.http.get(url).send().await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}
