use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use std::path::PathBuf;
use std::sync::Arc;

use sous_core::gemini::{API_BASE_URL, DEFAULT_MODEL};
use sous_core::generation::{FakeService, GenerationClient, StructuredClient};

use crate::gemini::GeminiService;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Gemini,
    Fake,
}

impl std::str::FromStr for Provider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "fake" => Ok(Self::Fake),
            _ => bail!("Invalid SOUS_PROVIDER '{s}'. Must be one of: gemini, fake"),
        }
    }
}

pub struct Config {
    pub db_path: PathBuf,
    pub data_dir: PathBuf,
    pub provider: Provider,
    pub model: String,
    pub gemini_api_key: Option<String>,
    pub gemini_base_url: String,
}

/// First non-blank value among the named environment variables.
fn env_value(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|n| std::env::var(n).ok())
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}

impl Config {
    pub fn load() -> Result<Self> {
        let proj_dirs =
            ProjectDirs::from("", "", "sous").context("Could not determine home directory")?;

        let data_dir = proj_dirs.data_dir().to_path_buf();
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        let db_path = data_dir.join("sous.db");

        let provider = env_value(&["SOUS_PROVIDER"])
            .map(|p| p.parse::<Provider>())
            .transpose()?
            .unwrap_or(Provider::Gemini);

        Ok(Config {
            db_path,
            data_dir,
            provider,
            model: env_value(&["SOUS_MODEL"]).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            gemini_api_key: env_value(&["GEMINI_API_KEY", "API_KEY"]),
            gemini_base_url: env_value(&["SOUS_GEMINI_BASE_URL"])
                .unwrap_or_else(|| API_BASE_URL.to_string()),
        })
    }

    /// Build the generation client for the configured provider.
    ///
    /// A missing Gemini key is not fatal here: the client is still built and
    /// each call then fails, so the failure surfaces as the operation's
    /// status message.
    pub fn generation_client(&self) -> Result<Arc<dyn GenerationClient>> {
        match self.provider {
            Provider::Fake => Ok(Arc::new(StructuredClient::new(
                FakeService::with_sample_responses(),
            ))),
            Provider::Gemini => {
                if self.gemini_api_key.is_none() {
                    tracing::warn!("GEMINI_API_KEY is not set; generation requests will fail");
                }
                let key = self.gemini_api_key.as_deref().unwrap_or_default();
                let service = GeminiService::new(key, &self.model, &self.gemini_base_url)?;
                Ok(Arc::new(StructuredClient::new(service)))
            }
        }
    }

    /// Load the API key from disk, or generate a new one.
    ///
    /// Returns `(key, newly_created)` where `newly_created` is true when a
    /// fresh key was just generated (first run).
    pub fn load_or_create_api_key(&self) -> Result<(String, bool)> {
        use rand::Rng;
        use std::fmt::Write;

        let path = self.data_dir.join("api_key");

        if path.exists() {
            let key = std::fs::read_to_string(&path).context("Failed to read API key file")?;
            let key = key.trim().to_string();
            if !key.is_empty() {
                return Ok((key, false));
            }
        }

        let bytes: [u8; 32] = rand::rng().random();
        let key = bytes
            .iter()
            .fold(String::with_capacity(64), |mut acc: String, b| {
                let _ = write!(acc, "{b:02x}");
                acc
            });
        std::fs::write(&path, &key).context("Failed to write API key file")?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))
                .context("Failed to set API key file permissions")?;
        }
        eprintln!("Generated new API key: {key}");
        eprintln!("Include in requests: Authorization: Bearer {key}");
        Ok((key, true))
    }
}
