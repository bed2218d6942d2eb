use std::fs;
use std::path::Path;
use serde::{Deserialize, Serialize};
use anyhow::{Result, Context};
use log::warn;

/// Main configuration structure for form_genie
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Generative model settings
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// Google Forms API settings
    #[serde(default)]
    pub forms: FormsConfig,

    /// OAuth client bootstrap settings
    #[serde(default)]
    pub oauth: OAuthConfig,

    /// Terminal display configuration
    #[serde(default)]
    pub ui: UIConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// Model to use
    #[serde(default = "default_model")]
    pub model: String,

    /// API root, without the `/models/...` suffix
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,

    /// Temperature setting
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormsConfig {
    #[serde(default = "default_forms_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthConfig {
    /// Path or http(s) URL of the OAuth `client.json`
    #[serde(default = "default_client_config")]
    pub client_config: String,

    /// Redirect URI registered for the client
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UIConfig {
    /// Enable colorful output
    #[serde(default = "default_colorful")]
    pub colorful: bool,

    /// Show spinners while waiting on remote calls
    #[serde(default = "default_spinners")]
    pub spinners: bool,
}

// Default value functions
fn default_model() -> String { "gemini-2.5-flash".to_string() }
fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}
fn default_forms_base_url() -> String { "https://forms.googleapis.com/v1".to_string() }
fn default_client_config() -> String { "client.json".to_string() }
fn default_redirect_uri() -> String { "http://localhost:3000".to_string() }
fn default_colorful() -> bool { true }
fn default_spinners() -> bool { true }

impl Default for GeminiConfig {
    fn default() -> Self {
        GeminiConfig {
            model: default_model(),
            base_url: default_gemini_base_url(),
            temperature: None,
        }
    }
}

impl Default for FormsConfig {
    fn default() -> Self {
        FormsConfig { base_url: default_forms_base_url() }
    }
}

impl Default for OAuthConfig {
    fn default() -> Self {
        OAuthConfig {
            client_config: default_client_config(),
            redirect_uri: default_redirect_uri(),
        }
    }
}

impl Default for UIConfig {
    fn default() -> Self {
        UIConfig {
            colorful: default_colorful(),
            spinners: default_spinners(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))
    }

    /// Load configuration from command line argument or default locations
    pub fn load(config_path: &Option<String>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::from_file(shellexpand::tilde(path).as_ref());
        }

        let default_paths = [
            "form_genie.toml",
            ".form_genie.toml",
            "~/.config/form_genie/config.toml",
        ];

        for path in default_paths {
            let expanded_path = shellexpand::tilde(path);
            if Path::new(expanded_path.as_ref()).exists() {
                match Self::from_file(expanded_path.as_ref()) {
                    Ok(config) => return Ok(config),
                    Err(e) => warn!("Failed to load config from {}: {:#}", path, e),
                }
            }
        }

        Ok(Self::default())
    }

    /// Merge with command-line arguments (CLI args take precedence)
    pub fn merge_with_args(&mut self, headless: bool) {
        if headless {
            self.ui.colorful = false;
            self.ui.spinners = false;
        }
    }
}

/// Read the Gemini API key, pulling in `.env` and the legacy `api` file first.
pub fn gemini_api_key() -> Option<String> {
    key_from_file(Path::new("api")).or_else(|| {
        let _ = dotenv::dotenv();
        std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
    })
}

/// `GEMINI_API_KEY` from a dotenv-style file. Takes priority over the environment.
fn key_from_file(path: &Path) -> Option<String> {
    dotenv::from_path_iter(path)
        .ok()?
        .filter_map(|entry| entry.ok())
        .find(|(name, value)| name == "GEMINI_API_KEY" && !value.trim().is_empty())
        .map(|(_, value)| value)
}
