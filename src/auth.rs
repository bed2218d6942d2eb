use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use log::{info, warn};
use reqwest::Url;
use serde::Deserialize;

use crate::error::FormGenieError;

/// Scopes needed to create forms and the Drive files backing them.
pub const SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/forms",
    "https://www.googleapis.com/auth/drive.file",
];

pub const DEFAULT_CLIENT_ID: &str =
    "895209921143-8u53fd0esgeib50mlvm6udb1agh3393d.apps.googleusercontent.com";

const AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Bearer token held in memory only. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccessToken(***)")
    }
}

/// What the token endpoint hands back: a token, or an error code and description.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl TokenResponse {
    pub fn into_token(self) -> std::result::Result<AccessToken, FormGenieError> {
        if let Some(code) = self.error {
            let message = self.error_description.unwrap_or(code);
            return Err(FormGenieError::Auth(message));
        }
        match self.access_token {
            Some(token) if !token.trim().is_empty() => Ok(AccessToken::new(token.trim())),
            _ => Err(FormGenieError::Auth(
                "Sign-in did not return an access token.".to_string(),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ClientFile {
    web: WebClient,
}

#[derive(Debug, Deserialize)]
struct WebClient {
    client_id: String,
}

/// OAuth client identity resolved once at startup and passed around explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthClientConfig {
    pub client_id: String,
}

impl Default for OAuthClientConfig {
    fn default() -> Self {
        Self { client_id: DEFAULT_CLIENT_ID.to_string() }
    }
}

impl OAuthClientConfig {
    /// Load `client.json` from a path or http(s) URL, falling back to the built-in id.
    pub async fn load(source: &str) -> Self {
        match Self::try_load(source).await {
            Ok(config) => {
                info!("Loaded OAuth client configuration from {}", source);
                config
            }
            Err(e) => {
                warn!("Failed to load {}, using default client ID: {:#}", source, e);
                Self::default()
            }
        }
    }

    async fn try_load(source: &str) -> Result<Self> {
        let contents = if source.starts_with("http://") || source.starts_with("https://") {
            reqwest::get(source)
                .await
                .and_then(|r| r.error_for_status())
                .with_context(|| format!("Failed to fetch {}", source))?
                .text()
                .await?
        } else {
            let path = shellexpand::tilde(source);
            tokio::fs::read_to_string(Path::new(path.as_ref()))
                .await
                .with_context(|| format!("Failed to read {}", source))?
        };

        let file: ClientFile =
            serde_json::from_str(&contents).context("Failed to parse OAuth client file")?;
        Ok(Self { client_id: file.web.client_id })
    }

    /// Consent page URL for the implicit token flow.
    pub fn authorization_url(&self, redirect_uri: &str) -> Result<Url> {
        let scope = SCOPES.join(" ");
        Url::parse_with_params(
            AUTHORIZE_URL,
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("response_type", "token"),
                ("scope", scope.as_str()),
                ("include_granted_scopes", "true"),
            ],
        )
        .context("Failed to build authorization URL")
    }
}
