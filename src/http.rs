use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

const ERROR_BODY_LIMIT: usize = 240;

#[derive(Debug, Error)]
pub(crate) enum HttpError {
    #[error("HTTP status {status}{}", format_body(.body))]
    Status { status: u16, body: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("response decode failed: {0}")]
    Decode(String),
}

fn format_body(body: &str) -> String {
    if body.is_empty() {
        String::new()
    } else {
        format!(" ({body})")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Method {
    Get,
    Post,
    Put,
    Patch,
}

impl Method {
    fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Body {
    Empty,
    Json(Value),
    Form(Vec<(String, String)>),
}

#[derive(Debug, Clone)]
pub(crate) struct HttpRequest<'a> {
    pub(crate) method: Method,
    pub(crate) url: String,
    pub(crate) bearer: Option<&'a str>,
    pub(crate) query: Vec<(String, String)>,
    pub(crate) body: Body,
}

impl<'a> HttpRequest<'a> {
    pub(crate) fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            bearer: None,
            query: Vec::new(),
            body: Body::Empty,
        }
    }

    pub(crate) fn bearer(mut self, token: &'a str) -> Self {
        self.bearer = Some(token);
        self
    }

    pub(crate) fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub(crate) fn json(mut self, value: Value) -> Self {
        self.body = Body::Json(value);
        self
    }

    pub(crate) fn form(mut self, fields: &[(&str, &str)]) -> Self {
        self.body = Body::Form(
            fields
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
        );
        self
    }
}

#[derive(Debug, Clone)]
pub(crate) struct HttpResponse {
    pub(crate) status: u16,
    pub(crate) body: String,
}

/// Blocking client shared by the API and OAuth endpoints. One attempt per
/// request; failures go straight back to the caller.
#[derive(Debug, Clone)]
pub(crate) struct HttpClient {
    agent: ureq::Agent,
    user_agent: String,
}

impl HttpClient {
    pub(crate) fn new(user_agent: &str, connect_timeout: Duration, read_timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(connect_timeout)
            .timeout_read(read_timeout)
            .timeout_write(read_timeout)
            .build();
        Self {
            agent,
            user_agent: user_agent.to_string(),
        }
    }

    pub(crate) fn send(&self, request: HttpRequest<'_>) -> Result<HttpResponse, HttpError> {
        debug!(method = request.method.as_str(), url = %request.url, "sending request");

        let mut call = self
            .agent
            .request(request.method.as_str(), &request.url)
            .set("User-Agent", &self.user_agent);
        if let Some(token) = request.bearer {
            call = call.set("Authorization", &format!("Bearer {token}"));
        }
        for (key, value) in &request.query {
            call = call.query(key, value);
        }

        let result = match &request.body {
            Body::Empty => call.call(),
            Body::Json(value) => call
                .set("Content-Type", "application/json")
                .send_string(&value.to_string()),
            Body::Form(fields) => {
                let pairs: Vec<(&str, &str)> = fields
                    .iter()
                    .map(|(key, value)| (key.as_str(), value.as_str()))
                    .collect();
                call.send_form(&pairs)
            }
        };

        match result {
            Ok(response) => {
                let status = response.status();
                let body = response
                    .into_string()
                    .map_err(|err| HttpError::Decode(err.to_string()))?;
                debug!(status, url = %request.url, "request succeeded");
                Ok(HttpResponse { status, body })
            }
            Err(ureq::Error::Status(status, response)) => {
                let response_body = response.into_string().ok().unwrap_or_default();
                let body = response_body
                    .trim()
                    .chars()
                    .take(ERROR_BODY_LIMIT)
                    .collect::<String>();
                debug!(status, url = %request.url, "request rejected");
                Err(HttpError::Status { status, body })
            }
            Err(ureq::Error::Transport(err)) => Err(HttpError::Transport(err.to_string())),
        }
    }
}
