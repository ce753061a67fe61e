use std::env;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};

const DEFAULT_API_BASE: &str = "https://api.bgm.tv";
const DEFAULT_OAUTH_BASE: &str = "https://bgm.tv";
const DEFAULT_REDIRECT_PORT: u16 = 9090;
/// Loopback host both advertised in the redirect URI and bound for the
/// login redirect.
const REDIRECT_HOST: &str = "127.0.0.1";

#[derive(Debug, Clone)]
pub(crate) struct Settings {
    pub(crate) api_base: String,
    pub(crate) oauth_base: String,
    pub(crate) client_id: Option<String>,
    pub(crate) client_secret: Option<String>,
    pub(crate) redirect_port: u16,
    pub(crate) connect_timeout: Duration,
    pub(crate) read_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            oauth_base: DEFAULT_OAUTH_BASE.to_string(),
            client_id: None,
            client_secret: None,
            redirect_port: DEFAULT_REDIRECT_PORT,
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(15),
        }
    }
}

impl Settings {
    /// Reads `BGM_*` overrides on top of the defaults.
    pub(crate) fn from_env() -> Result<Self> {
        let mut settings = Self::default();
        if let Some(base) = non_empty_var("BGM_API_BASE") {
            settings.api_base = base.trim_end_matches('/').to_string();
        }
        if let Some(base) = non_empty_var("BGM_OAUTH_BASE") {
            settings.oauth_base = base.trim_end_matches('/').to_string();
        }
        settings.client_id = non_empty_var("BGM_CLIENT_ID");
        settings.client_secret = non_empty_var("BGM_CLIENT_SECRET");
        if let Some(port) = non_empty_var("BGM_REDIRECT_PORT") {
            settings.redirect_port = port
                .trim()
                .parse()
                .with_context(|| format!("BGM_REDIRECT_PORT is not a valid port: '{port}'"))?;
        }
        Ok(settings)
    }

    pub(crate) fn user_agent() -> String {
        format!("bangumi-cli/{}", env!("CARGO_PKG_VERSION"))
    }

    pub(crate) fn redirect_addr(&self) -> (&'static str, u16) {
        (REDIRECT_HOST, self.redirect_port)
    }

    pub(crate) fn redirect_uri(&self) -> String {
        format!("http://{REDIRECT_HOST}:{}", self.redirect_port)
    }

    pub(crate) fn app_credentials(&self) -> Result<(&str, &str)> {
        match (self.client_id.as_deref(), self.client_secret.as_deref()) {
            (Some(id), Some(secret)) => Ok((id, secret)),
            _ => Err(anyhow!(
                "BGM_CLIENT_ID and BGM_CLIENT_SECRET must be set (register an app at https://bgm.tv/dev/app)"
            )),
        }
    }

    pub(crate) fn login_url(&self) -> Result<String> {
        let (client_id, _) = self.app_credentials()?;
        Ok(format!(
            "{}/oauth/authorize?client_id={client_id}&response_type=code&redirect_uri={}",
            self.oauth_base,
            self.redirect_uri()
        ))
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}
