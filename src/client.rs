//! Compile requests, the outcomes they resolve to, and the HTTP client that
//! talks to the remote execution service.

use std::future::Future;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::config::Config;
use crate::language::Language;

pub const CONNECT_FAILURE: &str =
    "Could not connect to the compilation server. Please check if it is running.";
pub const GENERIC_FAILURE: &str = "An error occurred while trying to compile your code.";

/// One submission, built fresh from the session for every run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileRequest {
    pub language: Language,
    pub code: String,
    pub stdin: String,
}

impl CompileRequest {
    pub fn new(language: Language, code: impl Into<String>, stdin: impl Into<String>) -> Self {
        Self {
            language,
            code: code.into(),
            stdin: stdin.into(),
        }
    }
}

/// Normalized result of one submission attempt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CompileOutcome {
    Success {
        exit_code: i32,
        stdout: String,
        stderr: String,
    },
    ExecutionFailure {
        exit_code: i32,
        stdout: String,
        stderr: String,
        error: String,
    },
    TransportFailure {
        message: String,
    },
}

impl CompileOutcome {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::TransportFailure {
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Success { exit_code, .. } | Self::ExecutionFailure { exit_code, .. } => {
                Some(*exit_code)
            }
            Self::TransportFailure { .. } => None,
        }
    }
}

/// Anything that can turn a request into a terminal outcome.
///
/// Implementations never fail: every problem is folded into
/// [`CompileOutcome::TransportFailure`].
pub trait CompileClient {
    fn submit(&self, request: &CompileRequest) -> impl Future<Output = CompileOutcome>;
}

/// Body the service returns once it actually ran the program.
#[derive(Debug, Deserialize)]
struct ExecutionReport {
    success: bool,
    exit_code: i32,
    #[serde(default)]
    stdout: Option<String>,
    #[serde(default)]
    stderr: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl From<ExecutionReport> for CompileOutcome {
    fn from(report: ExecutionReport) -> Self {
        let stdout = report.stdout.unwrap_or_default();
        let stderr = report.stderr.unwrap_or_default();
        if report.success {
            CompileOutcome::Success {
                exit_code: report.exit_code,
                stdout,
                stderr,
            }
        } else {
            CompileOutcome::ExecutionFailure {
                exit_code: report.exit_code,
                stdout,
                stderr,
                error: report.error.unwrap_or_default(),
            }
        }
    }
}

/// Turn a received response into an outcome.
///
/// Only a 2xx body carrying `success` and `exit_code` counts as an execution
/// report; everything else is classified from its error fields.
pub fn decode_response(status: StatusCode, body: &str) -> CompileOutcome {
    let payload: Option<Value> = serde_json::from_str(body).ok();

    if status.is_success() {
        if let Some(report) = payload
            .clone()
            .and_then(|value| serde_json::from_value::<ExecutionReport>(value).ok())
        {
            return report.into();
        }
        debug!(%status, "success status without an execution report");
    }

    CompileOutcome::transport(classify_error_body(payload.as_ref()))
}

fn classify_error_body(payload: Option<&Value>) -> String {
    let Some(payload) = payload else {
        return GENERIC_FAILURE.to_string();
    };

    if let Some(detail) = payload.get("detail").and_then(truthy_text) {
        return format!("Error: {detail}");
    }

    let server = ["error", "stderr"]
        .iter()
        .find_map(|key| payload.get(*key).and_then(truthy_text));
    match server {
        Some(message) => format!("Server Error: {message}"),
        None => GENERIC_FAILURE.to_string(),
    }
}

/// Field value as display text, skipping null, `false`, and empty strings.
fn truthy_text(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(text) if text.is_empty() => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

/// Production client posting JSON to `<base>/compile`.
#[derive(Clone, Debug)]
pub struct HttpClient {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: config.compile_endpoint(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl CompileClient for HttpClient {
    async fn submit(&self, request: &CompileRequest) -> CompileOutcome {
        info!(
            endpoint = %self.endpoint,
            language = %request.language,
            code_bytes = request.code.len(),
            stdin_bytes = request.stdin.len(),
            "submitting compile request"
        );

        let response = match self.http.post(&self.endpoint).json(request).send().await {
            Ok(response) => response,
            Err(err) if err.is_builder() => {
                debug!("request could not be built: {err}");
                return CompileOutcome::transport(format!("Client-side error: {err}"));
            }
            Err(err) => {
                debug!("no response from compile service: {err}");
                return CompileOutcome::transport(CONNECT_FAILURE);
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(err) => {
                debug!(%status, "failed to read response body: {err}");
                String::new()
            }
        };

        let outcome = decode_response(status, &body);
        debug!(%status, exit_code = ?outcome.exit_code(), "compile request finished");
        outcome
    }
}
