//! HTTP gateway to the scoring backend.
//!
//! Stateless beyond the pooled connection: every operation is one request,
//! no retries. Retry policy belongs to the caller (a failed session is
//! restarted whole, by explicit user action).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{multipart, Client as ReqwestClient, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use crate::domain::models::{
    ApiConfig, EvaluationResult, HandwritingReport, ResponseItem, TestId, Trial,
};
use crate::domain::ports::{GatewayError, GatewayResult, TrialApi};

use super::types::{
    AudioTrialWire, EvaluationRequest, NextTrialRequest, NextTrialWire, ReadingTrialWire,
};

/// Reqwest-backed implementation of the [`TrialApi`] port.
#[derive(Debug, Clone)]
pub struct ApiGateway {
    http_client: ReqwestClient,
    base_url: String,
}

impl ApiGateway {
    /// Build a gateway from config. Fails only if the HTTP client itself
    /// cannot be constructed.
    pub fn new(config: &ApiConfig) -> GatewayResult<Self> {
        let http_client = ReqwestClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(4)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn baseline_path(test: TestId) -> &'static str {
        match test {
            TestId::Audio => "/baseline",
            TestId::Reading => "/test2/baseline",
        }
    }

    fn adaptive_path(test: TestId) -> &'static str {
        match test {
            TestId::Audio => "/next-trial",
            TestId::Reading => "/test2/adaptive",
        }
    }

    /// Check status and decode the body, classifying failures.
    async fn decode<T: DeserializeOwned>(response: Response) -> GatewayResult<T> {
        let status = response.status();
        debug!(status = %status, "backend response");

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_string());
            warn!(status = %status, body = %body, "backend request failed");
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl TrialApi for ApiGateway {
    #[instrument(skip(self), fields(test = %test))]
    async fn fetch_baseline(&self, test: TestId) -> GatewayResult<Vec<Trial>> {
        let url = self.url(Self::baseline_path(test));
        debug!(url = %url, "GET baseline batch");

        let response = self.http_client.get(&url).send().await?;
        let trials = match test {
            TestId::Audio => {
                let wires = Self::decode::<Vec<AudioTrialWire>>(response).await?;
                for wire in &wires {
                    wire.ensure_answerable().map_err(GatewayError::Decode)?;
                }
                wires.into_iter().map(Trial::from).collect()
            }
            TestId::Reading => Self::decode::<Vec<ReadingTrialWire>>(response)
                .await?
                .into_iter()
                .map(Trial::from)
                .collect(),
        };
        Ok(trials)
    }

    #[instrument(skip(self, responses), fields(test = %test, history = responses.len()))]
    async fn fetch_next_trial(
        &self,
        test: TestId,
        responses: &[ResponseItem],
    ) -> GatewayResult<Option<Trial>> {
        let url = self.url(Self::adaptive_path(test));
        debug!(url = %url, "POST adaptive next-trial request");

        let body = NextTrialRequest::new(test, responses);
        let response = self.http_client.post(&url).json(&body).send().await?;

        let next = match test {
            TestId::Audio => {
                let wire = Self::decode::<NextTrialWire<AudioTrialWire>>(response).await?;
                if let Some(served) = wire.trial() {
                    served.ensure_answerable().map_err(GatewayError::Decode)?;
                }
                wire.into_trial()
            }
            TestId::Reading => Self::decode::<NextTrialWire<ReadingTrialWire>>(response)
                .await?
                .into_trial(),
        };
        Ok(next)
    }

    #[instrument(skip_all, fields(audio = audio.len(), reading = reading.len()))]
    async fn submit_evaluation(
        &self,
        audio: &[ResponseItem],
        reading: &[ResponseItem],
    ) -> GatewayResult<EvaluationResult> {
        let url = self.url("/evaluate_dyslexia");
        debug!(url = %url, "POST final evaluation");

        let body = EvaluationRequest::new(audio, reading);
        let response = self.http_client.post(&url).json(&body).send().await?;
        Self::decode(response).await
    }

    #[instrument(skip(self, image), fields(bytes = image.len()))]
    async fn analyze_handwriting(
        &self,
        image: Vec<u8>,
        filename: &str,
    ) -> GatewayResult<HandwritingReport> {
        let url = self.url("/dysgraphia");
        debug!(url = %url, "POST handwriting sample");

        let part = multipart::Part::bytes(image)
            .file_name(filename.to_string())
            .mime_str("image/png")
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        let form = multipart::Form::new().part("image", part);

        let response = self.http_client.post(&url).multipart(form).send().await?;
        Self::decode(response).await
    }
}
