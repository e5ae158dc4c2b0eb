use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;

use super::{Classifier, ExtractError, RelayError};
use crate::contract::{self, ExtractedTransaction};

#[derive(Serialize, Debug)]
struct RelayRequest<'a> {
    text: &'a str,
    today: NaiveDate,
}

/// Classifies through a running relay server (`POST {base_url}/api/gemini`).
pub struct RelayClassifier {
    http_client: reqwest::Client,
    base_url: String,
}

impl RelayClassifier {
    pub fn new(base_url: &str) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/api/gemini", self.base_url)
    }
}

#[async_trait]
impl Classifier for RelayClassifier {
    async fn classify(
        &self,
        text: &str,
        today: NaiveDate,
    ) -> Result<Vec<ExtractedTransaction>, ExtractError> {
        let url = self.endpoint();
        log::info!("Sending text to relay at {url}...");
        let response = self
            .http_client
            .post(&url)
            .json(&RelayRequest { text, today })
            .send()
            .await
            .map_err(|err| RelayError::Upstream {
                status: 502,
                message: format!("Could not reach the relay at {url}: {err}"),
            })?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|err| RelayError::UpstreamFormat(err.to_string()))?;
        log::info!("Sending text to relay at {url}...done ({status})");

        if !response_is_success(status) {
            return Err(RelayError::from_response(status, &body).into());
        }
        contract::decode_response(&body, today)
    }
}

fn response_is_success(status: u16) -> bool {
    (200..300).contains(&status)
}
