//! Bio generation over the Gemini `generateContent` REST endpoint.

use async_trait::async_trait;
use lineage_core::bio::{BioError, BioGenerator};
use serde::Deserialize;

use crate::config::ClientConfig;

/// [`BioGenerator`] backed by a hosted text-generation model.
#[derive(Debug, Clone)]
pub struct HttpBioGenerator {
    client: reqwest::Client,
    api_url: String,
    model: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GenerateResponse {
    /// Text of the first candidate, parts concatenated.
    fn text(self) -> String {
        self.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

impl HttpBioGenerator {
    pub fn new(
        api_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(
            config.bio_api_url.clone(),
            config.bio_model.clone(),
            config.bio_api_key.clone(),
        )
    }
}

#[async_trait]
impl BioGenerator for HttpBioGenerator {
    async fn complete(&self, prompt: &str) -> Result<String, BioError> {
        let Some(api_key) = &self.api_key else {
            tracing::warn!("Bio generator API key is missing");
            return Err(BioError::MissingApiKey);
        };

        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
        });

        let response = self
            .client
            .post(format!("{}/models/{}:generateContent", self.api_url, self.model))
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| BioError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "Bio generation request rejected");
            return Err(BioError::Request(format!("status {status}")));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| BioError::Request(e.to_string()))?;
        Ok(parsed.text())
    }
}
