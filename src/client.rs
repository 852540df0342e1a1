//! HTTP client for the hosted Assistants API (v2).
//!
//! Implements [`AssistantGateway`] on top of `reqwest`. Every call is a single
//! request/response; there is no retry layer, the run deadline in the driver is
//! the only time budget.

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::config::Config;
use crate::gateway::{AssistantGateway, GatewayError, GatewayResult};
use crate::logging;
use crate::models::{
    Assistant, FileDeletion, FileObject, FilePurpose, ListResponse, MessageOrder, NewMessage, Run,
    Thread, ThreadMessage,
};

const OPENAI_BETA: &str = "openai-beta";
const ASSISTANTS_V2: &str = "assistants=v2";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const MAX_ERROR_BODY_CHARS: usize = 500;
const MESSAGE_PAGE_SIZE: u32 = 100;

// === Types ===

/// Client for the hosted assistant service.
#[must_use]
#[derive(Clone)]
pub struct AssistantsClient {
    http_client: reqwest::Client,
    base_url: String,
}

// === AssistantsClient ===

impl AssistantsClient {
    /// Create a client from CLI configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let api_key = config.api_key()?;
        let base_url = config.base_url();
        logging::info(format!("Assistant gateway base URL: {base_url}"));
        Self::with_base_url(&api_key, &base_url)
    }

    /// Create a client against an explicit base URL (no trailing `/v1`).
    pub fn with_base_url(api_key: &str, base_url: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {api_key}"))?,
        );
        headers.insert(OPENAI_BETA, HeaderValue::from_static(ASSISTANTS_V2));

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> GatewayResult<T> {
        let response = self.http_client.get(self.url(path)).send().await?;
        decode_response(response).await
    }

    async fn post_json<T: DeserializeOwned>(&self, path: &str, body: &Value) -> GatewayResult<T> {
        let response = self
            .http_client
            .post(self.url(path))
            .json(body)
            .send()
            .await?;
        decode_response(response).await
    }
}

// === Trait Implementations ===

#[async_trait]
impl AssistantGateway for AssistantsClient {
    async fn create_thread(&self) -> GatewayResult<Thread> {
        self.post_json("threads", &json!({})).await
    }

    async fn create_message(
        &self,
        thread_id: &str,
        message: &NewMessage,
    ) -> GatewayResult<ThreadMessage> {
        let body = serde_json::to_value(message)?;
        self.post_json(&format!("threads/{thread_id}/messages"), &body)
            .await
    }

    async fn create_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
        instructions: &str,
    ) -> GatewayResult<Run> {
        let body = json!({
            "assistant_id": assistant_id,
            "instructions": instructions,
        });
        self.post_json(&format!("threads/{thread_id}/runs"), &body)
            .await
    }

    async fn get_run(&self, thread_id: &str, run_id: &str) -> GatewayResult<Run> {
        self.get_json(&format!("threads/{thread_id}/runs/{run_id}"))
            .await
    }

    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> GatewayResult<Run> {
        self.post_json(
            &format!("threads/{thread_id}/runs/{run_id}/cancel"),
            &json!({}),
        )
        .await
    }

    async fn list_messages(
        &self,
        thread_id: &str,
        order: MessageOrder,
        limit: Option<u32>,
    ) -> GatewayResult<Vec<ThreadMessage>> {
        let base = format!("threads/{thread_id}/messages?order={}", order.as_str());
        if let Some(limit) = limit {
            let page: ListResponse<ThreadMessage> =
                self.get_json(&format!("{base}&limit={limit}")).await?;
            return Ok(page.data);
        }

        // Without a limit the whole thread is returned, following `after` cursors.
        let mut messages = Vec::new();
        let mut after: Option<String> = None;
        loop {
            let mut path = format!("{base}&limit={MESSAGE_PAGE_SIZE}");
            if let Some(cursor) = &after {
                path.push_str(&format!("&after={cursor}"));
            }
            let page: ListResponse<ThreadMessage> = self.get_json(&path).await?;
            let next = page.data.last().map(|message| message.id.clone());
            messages.extend(page.data);
            match next {
                Some(cursor) if page.has_more => after = Some(cursor),
                _ => break,
            }
        }
        if after.is_some() {
            logging::info(format!(
                "Listed {} messages of thread {thread_id} across several pages",
                messages.len()
            ));
        }
        Ok(messages)
    }

    async fn upload_file(
        &self,
        path: &Path,
        file_name: &str,
        purpose: FilePurpose,
    ) -> GatewayResult<FileObject> {
        let bytes = tokio::fs::read(path).await?;
        let part = Part::bytes(bytes).file_name(file_name.to_string());
        let form = Form::new()
            .text("purpose", purpose.as_str())
            .part("file", part);
        let response = self
            .http_client
            .post(self.url("files"))
            .multipart(form)
            .send()
            .await?;
        decode_response(response).await
    }

    async fn get_file(&self, file_id: &str) -> GatewayResult<FileObject> {
        self.get_json(&format!("files/{file_id}")).await
    }

    async fn delete_file(&self, file_id: &str) -> GatewayResult<FileDeletion> {
        let response = self
            .http_client
            .delete(self.url(&format!("files/{file_id}")))
            .send()
            .await?;
        decode_response(response).await
    }

    async fn get_assistant(&self, assistant_id: &str) -> GatewayResult<Assistant> {
        self.get_json(&format!("assistants/{assistant_id}")).await
    }
}

// === Response Helpers ===

async fn decode_response<T: DeserializeOwned>(response: reqwest::Response) -> GatewayResult<T> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(GatewayError::Api {
            status: status.as_u16(),
            message: api_error_message(&body),
        });
    }
    Ok(serde_json::from_str(&body)?)
}

/// Prefer the JSON `error.message`; fall back to a truncated raw body.
fn api_error_message(body: &str) -> String {
    let structured = serde_json::from_str::<Value>(body).ok().and_then(|value| {
        value
            .get("error")
            .and_then(|error| error.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string)
    });
    structured.unwrap_or_else(|| {
        let trimmed = body.trim();
        if trimmed.chars().count() > MAX_ERROR_BODY_CHARS {
            let cut: String = trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect();
            format!("{cut}...")
        } else {
            trimmed.to_string()
        }
    })
}
