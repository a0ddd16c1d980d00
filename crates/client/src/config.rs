/// Client configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the family API, including the `/api` prefix.
    pub api_url: String,
    /// Base URL of the text-generation service.
    pub bio_api_url: String,
    /// Model used for bio generation.
    pub bio_model: String,
    /// Key for the text-generation service. Without it bio generation
    /// reports a missing key instead of calling out.
    pub bio_api_key: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl ClientConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var           | Default                                              |
    /// |-------------------|------------------------------------------------------|
    /// | `LINEAGE_API_URL` | `http://localhost:3001/api`                          |
    /// | `BIO_API_URL`     | `https://generativelanguage.googleapis.com/v1beta`   |
    /// | `BIO_MODEL`       | `gemini-2.5-flash`                                   |
    /// | `BIO_API_KEY`     | unset                                                |
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Self {
            api_url: non_empty("LINEAGE_API_URL")
                .unwrap_or_else(|| "http://localhost:3001/api".into())
                .trim_end_matches('/')
                .to_string(),
            bio_api_url: non_empty("BIO_API_URL")
                .unwrap_or_else(|| "https://generativelanguage.googleapis.com/v1beta".into())
                .trim_end_matches('/')
                .to_string(),
            bio_model: non_empty("BIO_MODEL").unwrap_or_else(|| "gemini-2.5-flash".into()),
            bio_api_key: non_empty("BIO_API_KEY"),
        }
    }
}
