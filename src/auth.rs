use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Settings;
use crate::http::{HttpClient, HttpError, HttpRequest, Method};

#[derive(Debug, Error)]
pub(crate) enum AuthError {
    #[error("no stored credential at {0}")]
    MissingCredential(String),
    #[error("credential file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("credential file is not valid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("token endpoint failed: {0}")]
    Http(#[from] HttpError),
    #[error("token endpoint returned an invalid body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("authorization redirect did not carry a code")]
    MissingCode,
    #[error("BGM_CLIENT_ID and BGM_CLIENT_SECRET must be set to request tokens")]
    MissingAppCredentials,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Credential {
    pub(crate) access_token: String,
    #[serde(default)]
    pub(crate) token_type: String,
    #[serde(default)]
    pub(crate) expires_in: i64,
    pub(crate) refresh_token: String,
    #[serde(default)]
    pub(crate) scope: Option<String>,
    #[serde(default)]
    pub(crate) user_id: Option<u64>,
}

impl Credential {
    /// Overlays a refresh response, keeping fields the response left out.
    pub(crate) fn merge(&mut self, refreshed: Credential) {
        let previous_user = self.user_id;
        let previous_scope = self.scope.take();
        *self = refreshed;
        if self.user_id.is_none() {
            self.user_id = previous_user;
        }
        if self.scope.is_none() {
            self.scope = previous_scope;
        }
    }
}

pub(crate) fn load_credential(path: &Path) -> Result<Credential, AuthError> {
    if !path.exists() {
        return Err(AuthError::MissingCredential(path.display().to_string()));
    }
    let raw = fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&raw)?)
}

pub(crate) fn store_credential(path: &Path, credential: &Credential) -> Result<(), AuthError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_yaml::to_string(credential)?)?;
    info!(path = %path.display(), "stored credential");
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AuthStatus {
    Valid,
    Expired,
}

#[derive(Debug, Deserialize)]
struct TokenStatus {
    expires: i64,
}

/// The `bgm.tv/oauth` endpoints.
#[derive(Debug, Clone)]
pub(crate) struct OAuth {
    http: HttpClient,
    base_url: String,
    client_id: Option<String>,
    client_secret: Option<String>,
    redirect_uri: String,
}

impl OAuth {
    pub(crate) fn new(http: HttpClient, settings: &Settings) -> Self {
        Self {
            http,
            base_url: settings.oauth_base.trim_end_matches('/').to_string(),
            client_id: settings.client_id.clone(),
            client_secret: settings.client_secret.clone(),
            redirect_uri: settings.redirect_uri(),
        }
    }

    fn request_token(&self, grant: &str, key: &str, value: &str) -> Result<Credential, AuthError> {
        let (Some(client_id), Some(client_secret)) =
            (self.client_id.as_deref(), self.client_secret.as_deref())
        else {
            return Err(AuthError::MissingAppCredentials);
        };
        info!(grant, "requesting access token");
        let response = self.http.send(
            HttpRequest::new(Method::Post, format!("{}/oauth/access_token", self.base_url)).form(
                &[
                    ("client_id", client_id),
                    ("client_secret", client_secret),
                    ("grant_type", grant),
                    (key, value),
                    ("redirect_uri", self.redirect_uri.as_str()),
                ],
            ),
        )?;
        Ok(serde_json::from_str(&response.body)?)
    }

    pub(crate) fn exchange_code(&self, code: &str) -> Result<Credential, AuthError> {
        self.request_token("authorization_code", "code", code)
    }

    pub(crate) fn refresh(&self, refresh_token: &str) -> Result<Credential, AuthError> {
        self.request_token("refresh_token", "refresh_token", refresh_token)
    }

    /// Expiry of `access_token` as unix seconds.
    pub(crate) fn token_expiry(&self, access_token: &str) -> Result<i64, AuthError> {
        let response = self.http.send(
            HttpRequest::new(Method::Post, format!("{}/oauth/token_status", self.base_url))
                .query("access_token", access_token),
        )?;
        let status: TokenStatus = serde_json::from_str(&response.body)?;
        Ok(status.expires)
    }

    /// A token whose status cannot be read is treated as expired so the
    /// caller refreshes it.
    pub(crate) fn status(&self, access_token: &str) -> AuthStatus {
        match self.token_expiry(access_token) {
            Ok(expires) if expires > Utc::now().timestamp() => AuthStatus::Valid,
            Ok(expires) => {
                info!(expires, "access token expired");
                AuthStatus::Expired
            }
            Err(err) => {
                warn!("token status check failed: {err}");
                AuthStatus::Expired
            }
        }
    }
}

/// Waits for the browser redirect on `listener` and returns the `code`
/// query parameter. The browser gets a short page telling the user to return
/// to the terminal.
pub(crate) fn capture_authorization_code(listener: &TcpListener) -> Result<String, AuthError> {
    let (mut stream, _) = listener.accept()?;
    let request_line = read_request_line(&stream)?;
    let code = parse_code(&request_line);
    respond(&mut stream, code.is_some())?;
    code.ok_or(AuthError::MissingCode)
}

/// Reads the whole request head and returns its first line.
fn read_request_line(stream: &TcpStream) -> std::io::Result<String> {
    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();
    reader.read_line(&mut request_line)?;
    let mut header = String::new();
    loop {
        header.clear();
        if reader.read_line(&mut header)? == 0 || header.trim_end().is_empty() {
            break;
        }
    }
    Ok(request_line)
}

pub(crate) fn parse_code(request_line: &str) -> Option<String> {
    let target = request_line.split_whitespace().nth(1)?;
    let (_, query) = target.split_once('?')?;
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "code")
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

fn respond(stream: &mut TcpStream, success: bool) -> std::io::Result<()> {
    let message = if success {
        "Login complete. You can close this window and return to the terminal."
    } else {
        "No authorization code received. Run `bgm login` again."
    };
    let body = format!(
        "<html><head><title>bgm</title><style>body {{text-align: center;}}</style></head>\
         <body><h1>{message}</h1></body></html>"
    );
    write!(
        stream,
        "HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )?;
    stream.flush()
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::io::Read;
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    use super::*;
    use crate::test_server::{Behavior, TestServer};

    fn oauth(server: &TestServer) -> OAuth {
        let http = HttpClient::new(
            "bangumi-cli/test",
            Duration::from_millis(500),
            Duration::from_millis(500),
        );
        let settings = Settings {
            oauth_base: server.base_url().to_string(),
            client_id: Some("client".to_string()),
            client_secret: Some("secret".to_string()),
            ..Settings::default()
        };
        OAuth::new(http, &settings)
    }

    fn sample_credential() -> Credential {
        Credential {
            access_token: "access".to_string(),
            token_type: "Bearer".to_string(),
            expires_in: 604800,
            refresh_token: "refresh".to_string(),
            scope: None,
            user_id: Some(42),
        }
    }

    fn temp_dir() -> std::path::PathBuf {
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        env::temp_dir().join(format!("bangumi-cli-auth-{}-{ts}", std::process::id()))
    }

    #[test]
    fn parse_code_reads_query_parameter() {
        assert_eq!(
            parse_code("GET /?code=abc123&state=x HTTP/1.1\r\n"),
            Some("abc123".to_string())
        );
        assert_eq!(parse_code("GET /favicon.ico HTTP/1.1\r\n"), None);
        assert_eq!(parse_code("GET /?code= HTTP/1.1\r\n"), None);
    }

    #[test]
    fn credential_survives_store_and_load() {
        let dir = temp_dir();
        let path = dir.join("nested").join("auth.yaml");
        let credential = sample_credential();

        store_credential(&path, &credential).expect("store should create parents");
        let loaded = load_credential(&path).expect("load should parse");
        let _ = fs::remove_dir_all(&dir);

        assert_eq!(loaded, credential);
    }

    #[test]
    fn load_credential_reports_missing_file() {
        let path = temp_dir().join("auth.yaml");
        let err = load_credential(&path).expect_err("missing file should fail");
        assert!(matches!(err, AuthError::MissingCredential(_)));
    }

    #[test]
    fn exchange_code_posts_form_and_parses_credential() {
        let body = r#"{"access_token":"new","expires_in":604800,"token_type":"Bearer","scope":null,"refresh_token":"r2","user_id":42}"#;
        let server = TestServer::spawn(vec![Behavior::Respond(200, body.to_string())]);

        let credential = oauth(&server)
            .exchange_code("abc123")
            .expect("exchange should succeed");

        assert_eq!(credential.access_token, "new");
        assert_eq!(credential.user_id, Some(42));
        let raw = server.request(0);
        assert!(raw.starts_with("POST /oauth/access_token "));
        assert!(raw.contains("grant_type=authorization_code"), "{raw}");
        assert!(raw.contains("code=abc123"), "{raw}");
    }

    #[test]
    fn refresh_without_app_credentials_sends_nothing() {
        let server = TestServer::spawn(Vec::new());
        let http = HttpClient::new(
            "bangumi-cli/test",
            Duration::from_millis(500),
            Duration::from_millis(500),
        );
        let settings = Settings {
            oauth_base: server.base_url().to_string(),
            ..Settings::default()
        };

        let err = OAuth::new(http, &settings)
            .refresh("refresh")
            .expect_err("app credentials are required");

        assert!(matches!(err, AuthError::MissingAppCredentials));
        assert_eq!(server.request_count(), 0);
    }

    #[test]
    fn status_is_expired_when_expiry_has_passed_or_check_fails() {
        let past = Utc::now().timestamp() - 10;
        let future = Utc::now().timestamp() + 3600;
        let server = TestServer::spawn(vec![
            Behavior::Respond(200, format!(r#"{{"expires":{past}}}"#)),
            Behavior::Respond(200, format!(r#"{{"expires":{future}}}"#)),
            Behavior::Respond(401, "invalid token".to_string()),
        ]);
        let oauth = oauth(&server);

        assert_eq!(oauth.status("token"), AuthStatus::Expired);
        assert_eq!(oauth.status("token"), AuthStatus::Valid);
        assert_eq!(oauth.status("token"), AuthStatus::Expired);
        assert!(
            server
                .request(0)
                .starts_with("POST /oauth/token_status?access_token=token ")
        );
    }

    #[test]
    fn merge_keeps_user_id_missing_from_refresh() {
        let mut credential = sample_credential();
        let refreshed = Credential {
            access_token: "fresh".to_string(),
            user_id: None,
            ..sample_credential()
        };
        credential.merge(refreshed);
        assert_eq!(credential.access_token, "fresh");
        assert_eq!(credential.user_id, Some(42));
    }

    #[test]
    fn capture_authorization_code_answers_browser() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind");
        let addr = listener.local_addr().expect("addr");
        let browser = std::thread::spawn(move || {
            let mut stream = TcpStream::connect(addr).expect("connect");
            stream
                .write_all(b"GET /?code=xyz HTTP/1.1\r\nHost: localhost\r\n\r\n")
                .expect("write");
            let mut reply = String::new();
            stream.read_to_string(&mut reply).expect("read");
            reply
        });

        let code = capture_authorization_code(&listener).expect("code should be captured");
        let reply = browser.join().expect("browser thread");

        assert_eq!(code, "xyz");
        assert!(reply.starts_with("HTTP/1.1 200 OK"));
        assert!(reply.contains("Login complete"));
    }
}
