use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::warn;

use crate::config::MESSAGE_TIMEOUT_SECS;
use crate::error::{AppError, Result};
use crate::message::{ClearResponse, Request, StatsResponse, TrackResponse};
use crate::types::{Settings, TrackEvent};

/// Sender side of the message interface. A failed send is reported once
/// (logged here and returned to the caller) and never retried.
#[derive(Debug, Clone)]
pub struct AggregatorClient {
    http: reqwest::Client,
    base_url: String,
}

impl AggregatorClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .no_proxy()
            .timeout(Duration::from_secs(MESSAGE_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn send<T: DeserializeOwned>(&self, request: &Request) -> Result<T> {
        let result = self.deliver(request).await;
        if let Err(e) = &result {
            warn!(action = request.action(), "Message not delivered, dropping: {e}");
        }
        result
    }

    async fn deliver<T: DeserializeOwned>(&self, request: &Request) -> Result<T> {
        let url = format!("{}/message", self.base_url);
        let resp = self.http.post(&url).json(request).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AppError::Delivery(format!("{status}: {body}")));
        }
        Ok(resp.json::<T>().await?)
    }

    pub async fn track_activity(&self, event: TrackEvent) -> Result<TrackResponse> {
        self.send(&Request::TrackActivity(event)).await
    }

    pub async fn get_stats(&self) -> Result<StatsResponse> {
        self.send(&Request::GetStats).await
    }

    pub async fn clear_data(&self) -> Result<ClearResponse> {
        self.send(&Request::ClearData).await
    }

    pub async fn get_settings(&self) -> Result<Settings> {
        self.send(&Request::GetSettings).await
    }
}
