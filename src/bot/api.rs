use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::types::{ApiResponse, File, GetFile, GetUpdates, SendMessage, Update};

const API_BASE: &str = "https://api.telegram.org";

/// Seconds Telegram holds a `getUpdates` request open.
pub const POLL_TIMEOUT_SECS: u64 = 10;

#[derive(Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    method_base: String,
    file_base: String,
}

impl TelegramClient {
    pub fn new(token: &str) -> Result<Self> {
        Self::with_base_url(API_BASE, token)
    }

    pub fn with_base_url(base: &str, token: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(POLL_TIMEOUT_SECS + 20))
            .build()
            .context("failed to build HTTP client")?;
        let base = base.trim_end_matches('/');

        Ok(Self {
            http,
            method_base: format!("{base}/bot{token}"),
            file_base: format!("{base}/file/bot{token}"),
        })
    }

    async fn call<B: Serialize, T: DeserializeOwned>(&self, method: &str, body: &B) -> Result<T> {
        let response: ApiResponse<T> = self
            .http
            .post(format!("{}/{method}", self.method_base))
            .json(body)
            .send()
            .await
            .with_context(|| format!("{method} request failed"))?
            .json()
            .await
            .with_context(|| format!("{method} returned an unreadable response"))?;
        unwrap_response(method, response)
    }

    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>> {
        self.call(
            "getUpdates",
            &GetUpdates {
                offset,
                timeout: POLL_TIMEOUT_SECS,
                allowed_updates: vec!["message"],
            },
        )
        .await
    }

    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        let _: serde_json::Value = self.call("sendMessage", &SendMessage { chat_id, text }).await?;
        Ok(())
    }

    pub async fn download_file(&self, file_id: &str) -> Result<Vec<u8>> {
        let file: File = self.call("getFile", &GetFile { file_id }).await?;
        let path = file
            .file_path
            .ok_or_else(|| anyhow!("file {} has no download path", file.file_id))?;
        let bytes = self
            .http
            .get(format!("{}/{path}", self.file_base))
            .send()
            .await
            .context("file download failed")?
            .error_for_status()
            .context("file download rejected")?
            .bytes()
            .await
            .context("file download interrupted")?;
        Ok(bytes.to_vec())
    }

    pub async fn send_document(&self, chat_id: i64, file_name: String, contents: Vec<u8>) -> Result<()> {
        let part = Part::bytes(contents)
            .file_name(file_name)
            .mime_str("text/calendar")?;
        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .part("document", part);

        let response: ApiResponse<serde_json::Value> = self
            .http
            .post(format!("{}/sendDocument", self.method_base))
            .multipart(form)
            .send()
            .await
            .context("sendDocument request failed")?
            .json()
            .await
            .context("sendDocument returned an unreadable response")?;
        unwrap_response("sendDocument", response).map(|_| ())
    }
}

fn unwrap_response<T>(method: &str, response: ApiResponse<T>) -> Result<T> {
    if !response.ok {
        bail!(
            "{method} failed: {}",
            response.description.unwrap_or_else(|| "no description".into())
        );
    }
    response
        .result
        .ok_or_else(|| anyhow!("{method} succeeded without a result"))
}
