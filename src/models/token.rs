use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::models::errors::{CatalogError, ErrorExt, ErrorKind};
use crate::Result;

const PRERENDER_AGENTS: [&str; 3] = ["HeadlessChrome", "Prerender", "Lighthouse"];

#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn new<S: Into<String>>(token: S) -> Self {
        Self(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BearerToken(***)")
    }
}

/// How the token endpoint encodes its answer.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, clap::ValueEnum)]
pub enum TokenFormat {
    /// `{"githubToken": "<token>"}`
    #[default]
    Plain,
    /// `{"token": "<base64 token>"}`
    Base64,
    /// The body itself is the token
    Text,
}

impl TokenFormat {
    fn default_field(&self) -> &'static str {
        match self {
            TokenFormat::Plain => "githubToken",
            TokenFormat::Base64 => "token",
            TokenFormat::Text => "",
        }
    }
}

#[derive(Clone, Debug)]
pub enum TokenState {
    Ready(BearerToken),
    Unavailable(String),
}

impl TokenState {
    /// Every write path goes through here; an unavailable token never turns into
    /// an unauthenticated request.
    pub fn bearer(&self) -> Result<&BearerToken> {
        match self {
            TokenState::Ready(token) => Ok(token),
            TokenState::Unavailable(_) => Err(CatalogError::disabled()),
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            TokenState::Ready(_) => None,
            TokenState::Unavailable(reason) => Some(reason),
        }
    }
}

pub fn is_prerender_agent(user_agent: &str) -> bool {
    PRERENDER_AGENTS
        .iter()
        .any(|agent| user_agent.contains(agent))
}

pub fn parse_token(body: &str, format: TokenFormat, field: Option<&str>) -> Result<BearerToken> {
    let token = match format {
        TokenFormat::Text => body.trim().to_owned(),
        TokenFormat::Plain | TokenFormat::Base64 => {
            let field = field.unwrap_or_else(|| format.default_field());
            let json = serde_json::from_str::<Value>(body).context("Token response is not JSON")?;

            let raw = json
                .get(field)
                .and_then(Value::as_str)
                .context(format!("Token response is missing the \"{}\" field", field))?;

            if format == TokenFormat::Base64 {
                let decoded = STANDARD
                    .decode(raw.trim())
                    .context("Failed to decode token")?;

                String::from_utf8(decoded)?.trim().to_owned()
            } else {
                raw.trim().to_owned()
            }
        }
    };

    if token.is_empty() {
        return Err(CatalogError::new(ErrorKind::TokenUnavailable, "Token is empty"));
    }

    Ok(BearerToken(token))
}

#[derive(Debug)]
pub struct TokenSource {
    client: Client,
    endpoint: Option<String>,
    format: TokenFormat,
    field: Option<String>,
}

impl TokenSource {
    pub fn new(
        client: Client,
        endpoint: Option<String>,
        format: TokenFormat,
        field: Option<String>,
    ) -> Self {
        Self {
            client,
            endpoint,
            format,
            field,
        }
    }

    /// Fetches the bearer token once. Failures are folded into
    /// [`TokenState::Unavailable`] with a readable reason.
    pub async fn acquire(&self, user_agent: &str) -> TokenState {
        if is_prerender_agent(user_agent) {
            debug!("Skipping token fetch for pre-render agent");
            return TokenState::Unavailable("Token fetch disabled for pre-render agent".to_owned());
        }

        match self.fetch().await {
            Ok(token) => {
                info!("Bearer token acquired");
                TokenState::Ready(token)
            }
            Err(e) => {
                warn!("Failed to fetch token: {}", e);
                TokenState::Unavailable(format!("Failed to fetch token: {}", e))
            }
        }
    }

    async fn fetch(&self) -> Result<BearerToken> {
        let endpoint = self.endpoint.as_deref().ok_or_else(|| {
            CatalogError::new(ErrorKind::TokenUnavailable, "No token endpoint configured")
        })?;

        debug!("Making GET request to token endpoint: {}", endpoint);

        let res = self.client.get(endpoint).send().await?;
        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(CatalogError::from_status(
                status.as_u16(),
                format!("Token endpoint returned {}", status),
            ));
        }

        parse_token(&body, self.format, self.field.as_deref())
    }
}
