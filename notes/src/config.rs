use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tree listings older than this are refetched.
pub const DEFAULT_TREE_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubConfig {
    pub api_base: String,
    pub raw_base: String,
    pub web_base: String,
    pub token: Option<String>,
    /// Browser session cookie for the web raw endpoint, `user_session=...`.
    pub session_cookie: Option<String>,
    pub timeout: Duration,
    pub tree_ttl: Duration,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.github.com".to_string(),
            raw_base: "https://raw.githubusercontent.com".to_string(),
            web_base: "https://github.com".to_string(),
            token: None,
            session_cookie: None,
            timeout: Duration::from_secs(30),
            tree_ttl: DEFAULT_TREE_TTL,
        }
    }
}

impl GithubConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = trim_trailing_slash(api_base.into());
        self
    }

    pub fn with_raw_base(mut self, raw_base: impl Into<String>) -> Self {
        self.raw_base = trim_trailing_slash(raw_base.into());
        self
    }

    pub fn with_web_base(mut self, web_base: impl Into<String>) -> Self {
        self.web_base = trim_trailing_slash(web_base.into());
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_session_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.session_cookie = Some(cookie.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_tree_ttl(mut self, ttl: Duration) -> Self {
        self.tree_ttl = ttl;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        for (name, url) in [
            ("API base", &self.api_base),
            ("raw base", &self.raw_base),
            ("web base", &self.web_base),
        ] {
            if url.is_empty() {
                return Err(format!("{} URL cannot be empty", name));
            }
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(format!("{} URL must start with http:// or https://", name));
            }
        }

        if let Some(token) = &self.token {
            if token.trim().is_empty() {
                return Err("Token cannot be blank".to_string());
            }
        }

        if self.timeout.is_zero() {
            return Err("Timeout must be greater than 0".to_string());
        }

        if self.tree_ttl.is_zero() {
            return Err("Tree TTL must be greater than 0".to_string());
        }

        Ok(())
    }
}

fn trim_trailing_slash(mut url: String) -> String {
    while url.ends_with('/') {
        url.pop();
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GithubConfig::default();
        assert_eq!(config.api_base, "https://api.github.com");
        assert_eq!(config.raw_base, "https://raw.githubusercontent.com");
        assert!(config.token.is_none());
        assert_eq!(config.tree_ttl, Duration::from_secs(300));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = GithubConfig::new()
            .with_api_base("https://ghe.example.com/api/v3/")
            .with_token("ghp_abc123")
            .with_timeout(Duration::from_secs(60))
            .with_tree_ttl(Duration::from_secs(30));

        assert_eq!(config.api_base, "https://ghe.example.com/api/v3");
        assert_eq!(config.token.as_deref(), Some("ghp_abc123"));
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = GithubConfig::default();

        config.api_base = "".to_string();
        assert!(config.validate().is_err());

        config.api_base = "not-a-url".to_string();
        assert!(config.validate().is_err());

        config.api_base = "https://api.github.com".to_string();
        config.token = Some("   ".to_string());
        assert!(config.validate().is_err());

        config.token = None;
        config.timeout = Duration::from_secs(0);
        assert!(config.validate().is_err());

        config.timeout = Duration::from_secs(30);
        config.tree_ttl = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_serialization() {
        let config = GithubConfig::default().with_token("t");
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: GithubConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config.api_base, deserialized.api_base);
        assert_eq!(config.token, deserialized.token);
    }
}
