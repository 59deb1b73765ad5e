use clap::Args;

use crate::endpoints::github::{GITHUB_API_URL, RAW_CONTENT_URL};
use crate::models::token::TokenFormat;

pub const DEFAULT_USER_AGENT: &str = concat!("skin-catalog/", env!("CARGO_PKG_VERSION"));

/// Connection settings shared by every command. Each flag falls back to an
/// environment variable so the tool can run from a `.env`-style shell.
#[derive(Clone, Debug, Args)]
pub struct Config {
    /// Owner of the repository holding the catalog files
    #[arg(long, env = "CATALOG_OWNER")]
    pub owner: String,

    /// Repository holding the catalog files
    #[arg(long, env = "CATALOG_REPO")]
    pub repo: String,

    #[arg(long, env = "CATALOG_BRANCH", default_value = "main")]
    pub branch: String,

    /// Directory inside the repository that holds the catalog files
    #[arg(long, env = "CATALOG_DATA_DIR", default_value = "")]
    pub data_dir: String,

    #[arg(long, env = "CATALOG_API_URL", default_value = GITHUB_API_URL)]
    pub api_url: String,

    #[arg(long, env = "CATALOG_RAW_URL", default_value = RAW_CONTENT_URL)]
    pub raw_url: String,

    /// Remote config endpoint handing out the bearer token
    #[arg(long, env = "CATALOG_TOKEN_ENDPOINT")]
    pub token_endpoint: Option<String>,

    #[arg(long, env = "CATALOG_TOKEN_FORMAT", value_enum, default_value_t = TokenFormat::Plain)]
    pub token_format: TokenFormat,

    /// Overrides the JSON field the token is read from
    #[arg(long, env = "CATALOG_TOKEN_FIELD")]
    pub token_field: Option<String>,

    /// Endpoint accepting multipart uploads of large archives
    #[arg(long, env = "CATALOG_UPLOAD_ENDPOINT")]
    pub upload_endpoint: Option<String>,

    #[arg(long, env = "CATALOG_UPLOAD_TOKEN", hide_env_values = true)]
    pub upload_token: Option<String>,

    #[arg(long, env = "CATALOG_USER_AGENT", default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,
}

impl Config {
    pub fn repo_location(&self) -> RepoLocation {
        RepoLocation {
            api_url: self.api_url.clone(),
            raw_url: self.raw_url.clone(),
            owner: self.owner.clone(),
            repo: self.repo.clone(),
            branch: self.branch.clone(),
            data_dir: self.data_dir.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepoLocation {
    pub api_url: String,
    pub raw_url: String,
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub data_dir: String,
}

impl RepoLocation {
    /// Path of a file relative to the repository root.
    pub fn path(&self, file: &str) -> String {
        let dir = self.data_dir.trim_matches('/');

        if dir.is_empty() {
            file.to_owned()
        } else {
            format!("{}/{}", dir, file)
        }
    }
}
