//! Generated member biographies.
//!
//! The text generator itself lives behind [`BioGenerator`]; this module owns
//! the prompt and the rule that bio generation never fails loudly. Every
//! outcome, including a missing API key, becomes a string the profile editor
//! can show as-is.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Upper bound on the bio length asked of the generator.
pub const MAX_BIO_WORDS: usize = 100;

pub const MISSING_KEY_MESSAGE: &str = "API Key missing. Cannot generate bio.";
pub const EMPTY_BIO_MESSAGE: &str = "No bio generated.";
pub const FAILED_BIO_MESSAGE: &str = "Error generating bio. Please try again.";

#[derive(Debug, thiserror::Error)]
pub enum BioError {
    #[error("Bio generator API key is not configured")]
    MissingApiKey,

    #[error("Bio generator request failed: {0}")]
    Request(String),
}

/// What the generator is told about the member.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BioRequest {
    pub name: String,
    #[serde(default)]
    pub birth_year: Option<i32>,
    /// Role in the family, e.g. "child" or "spouse".
    pub role: String,
    /// Free-text traits and facts.
    #[serde(default)]
    pub keywords: String,
}

impl BioRequest {
    pub fn prompt(&self) -> String {
        let birth_year = self
            .birth_year
            .map(|y| y.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        format!(
            "Write a short, dignified, and warm biography (max {MAX_BIO_WORDS} words) for a family tree member.\n\
             Name: {}\n\
             Birth Year: {birth_year}\n\
             Role in family: {}\n\
             Key traits/facts: {}\n\
             \n\
             Tone: Respectful, familial, celebrating heritage.",
            self.name.trim(),
            self.role.trim(),
            self.keywords.trim(),
        )
    }
}

/// A text-generation backend.
#[async_trait]
pub trait BioGenerator: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, BioError>;
}

/// Generate a bio, mapping every failure to a displayable message.
pub async fn generate_bio(generator: &dyn BioGenerator, request: &BioRequest) -> String {
    match generator.complete(&request.prompt()).await {
        Ok(text) if text.trim().is_empty() => EMPTY_BIO_MESSAGE.to_string(),
        Ok(text) => text.trim().to_string(),
        Err(BioError::MissingApiKey) => MISSING_KEY_MESSAGE.to_string(),
        Err(BioError::Request(_)) => FAILED_BIO_MESSAGE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Result<&'static str, fn() -> BioError>);

    #[async_trait]
    impl BioGenerator for Fixed {
        async fn complete(&self, _prompt: &str) -> Result<String, BioError> {
            match &self.0 {
                Ok(text) => Ok(text.to_string()),
                Err(make) => Err(make()),
            }
        }
    }

    fn request() -> BioRequest {
        BioRequest {
            name: "Amina Sano".into(),
            birth_year: Some(1990),
            role: "child".into(),
            keywords: "nurse, loves gardening".into(),
        }
    }

    #[test]
    fn prompt_carries_member_details() {
        let prompt = request().prompt();
        assert!(prompt.contains("Name: Amina Sano"));
        assert!(prompt.contains("Birth Year: 1990"));
        assert!(prompt.contains("Role in family: child"));
        assert!(prompt.contains("Key traits/facts: nurse, loves gardening"));
        assert!(prompt.contains("max 100 words"));
    }

    #[test]
    fn prompt_marks_unknown_birth_year() {
        let prompt = BioRequest { birth_year: None, ..request() }.prompt();
        assert!(prompt.contains("Birth Year: unknown"));
    }

    #[tokio::test]
    async fn generated_text_is_trimmed() {
        let bio = generate_bio(&Fixed(Ok("  A life well lived.\n")), &request()).await;
        assert_eq!(bio, "A life well lived.");
    }

    #[tokio::test]
    async fn failures_become_messages() {
        let empty = generate_bio(&Fixed(Ok("   ")), &request()).await;
        assert_eq!(empty, EMPTY_BIO_MESSAGE);

        let missing = generate_bio(&Fixed(Err(|| BioError::MissingApiKey)), &request()).await;
        assert_eq!(missing, MISSING_KEY_MESSAGE);

        let failed = generate_bio(&Fixed(Err(|| BioError::Request("503".into()))), &request()).await;
        assert_eq!(failed, FAILED_BIO_MESSAGE);
    }
}
