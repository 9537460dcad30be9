use directories::ProjectDirs;
use notes::GithubConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Locally persisted settings: credentials, extra notes refs, endpoint
/// overrides. `GITHUB_TOKEN` in the environment beats the file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub token: Option<String>,
    pub session_cookie: Option<String>,
    pub extra_refs: Vec<String>,
    pub api_base: Option<String>,
    pub raw_base: Option<String>,
    pub web_base: Option<String>,
    pub tree_ttl_secs: Option<u64>,
}

impl Settings {
    /// Loads settings from `path`, or from the platform config directory
    /// when no path is given. A missing default file is not an error.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) if path.exists() => path,
                _ => return Ok(Self::default().with_env_overrides()),
            },
        };

        let text = std::fs::read_to_string(&path).map_err(|source| SettingsError::Read {
            path: path.clone(),
            source,
        })?;
        let settings: Settings =
            toml::from_str(&text).map_err(|source| SettingsError::Parse { path, source })?;

        Ok(settings.with_env_overrides())
    }

    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "git-notes-viewer")
            .map(|dirs| dirs.config_dir().join("settings.toml"))
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(token) = std::env::var("GITHUB_TOKEN") {
            if !token.trim().is_empty() {
                self.token = Some(token);
            }
        }
        self
    }

    pub fn github_config(&self) -> GithubConfig {
        let mut config = GithubConfig::default();

        if let Some(api_base) = &self.api_base {
            config = config.with_api_base(api_base);
        }
        if let Some(raw_base) = &self.raw_base {
            config = config.with_raw_base(raw_base);
        }
        if let Some(web_base) = &self.web_base {
            config = config.with_web_base(web_base);
        }
        if let Some(token) = &self.token {
            config = config.with_token(token);
        }
        if let Some(cookie) = &self.session_cookie {
            config = config.with_session_cookie(cookie);
        }
        if let Some(ttl) = self.tree_ttl_secs {
            config = config.with_tree_ttl(Duration::from_secs(ttl));
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    #[serial]
    fn test_load_from_file() {
        std::env::remove_var("GITHUB_TOKEN");

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
token = "ghp_from_file"
extra_refs = ["notes/reviews", "notes/ci"]
tree_ttl_secs = 60
"#
        )
        .unwrap();

        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.token.as_deref(), Some("ghp_from_file"));
        assert_eq!(settings.extra_refs, vec!["notes/reviews", "notes/ci"]);

        let config = settings.github_config();
        assert_eq!(config.token.as_deref(), Some("ghp_from_file"));
        assert_eq!(config.tree_ttl, Duration::from_secs(60));
        assert_eq!(config.api_base, "https://api.github.com");
    }

    #[test]
    #[serial]
    fn test_env_token_wins() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"token = "ghp_from_file""#).unwrap();

        std::env::set_var("GITHUB_TOKEN", "ghp_from_env");
        let settings = Settings::load(Some(file.path())).unwrap();
        std::env::remove_var("GITHUB_TOKEN");

        assert_eq!(settings.token.as_deref(), Some("ghp_from_env"));
    }

    #[test]
    #[serial]
    fn test_missing_explicit_path_errors() {
        std::env::remove_var("GITHUB_TOKEN");

        let result = Settings::load(Some(Path::new("/nonexistent/settings.toml")));
        assert!(matches!(result, Err(SettingsError::Read { .. })));
    }

    #[test]
    #[serial]
    fn test_malformed_file_errors() {
        std::env::remove_var("GITHUB_TOKEN");

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "token = [not toml").unwrap();

        let result = Settings::load(Some(file.path()));
        assert!(matches!(result, Err(SettingsError::Parse { .. })));
    }
}
