use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Server -> Console push events
// ============================================================================

/// Events pushed by the server over the duplex channel
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundEvent {
    /// Program output to append to the output panel
    Output { content: String },

    /// AI response to render in the response panel
    AiResponse { content: String },

    /// Error text to append to the output panel
    Error { content: String },

    /// Any tag this client does not know about
    #[serde(other)]
    Unknown,
}

// ============================================================================
// HTTP request/response bodies
// ============================================================================

/// Body of `POST /api/run`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunRequest {
    pub code: String,
    pub language: Language,
}

/// Response of `POST /api/run`
///
/// The backend reports failures either as an error string or as
/// `{"output": <stderr>, "error": true}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RunResult {
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default, alias = "detail", skip_serializing_if = "Option::is_none")]
    pub error: Option<ServerError>,
}

/// Body of `POST /api/ai/generate`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub prompt: String,
    pub language: Language,
    pub current_code: String,
}

/// Response of `POST /api/ai/generate`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GenerateResult {
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default, alias = "detail", skip_serializing_if = "Option::is_none")]
    pub error: Option<ServerError>,
}

/// The `error` field as the backend actually sends it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ServerError {
    Flag(bool),
    Message(String),
    /// Framework-level `detail` payloads (validation error lists and the like)
    Detail(serde_json::Value),
}

// ============================================================================
// Shared Types
// ============================================================================

/// Languages the execution backend knows how to run
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Python,
    JavaScript,
    Html,
    Css,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported language: {0} (expected one of python, javascript, html, css)")]
pub struct ParseLanguageError(pub String);

// ============================================================================
// Helper implementations
// ============================================================================

impl InboundEvent {
    pub fn output(content: impl Into<String>) -> Self {
        Self::Output {
            content: content.into(),
        }
    }

    pub fn ai_response(content: impl Into<String>) -> Self {
        Self::AiResponse {
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self::Error {
            content: content.into(),
        }
    }
}

impl ServerError {
    /// Resolve to a displayable message, or `None` when the field is falsy.
    ///
    /// `fallback` is used for a bare `true` flag, where the detail lives in
    /// the sibling payload field.
    pub fn message(&self, fallback: Option<&str>) -> Option<String> {
        match self {
            Self::Flag(false) => None,
            Self::Flag(true) => Some(
                fallback
                    .filter(|s| !s.is_empty())
                    .unwrap_or("Process failed")
                    .to_string(),
            ),
            Self::Message(s) if s.is_empty() => None,
            Self::Message(s) => Some(s.clone()),
            Self::Detail(serde_json::Value::String(s)) => Some(s.clone()),
            Self::Detail(value) => Some(value.to_string()),
        }
    }
}

impl RunResult {
    /// The server-reported error, if any
    pub fn error_message(&self) -> Option<String> {
        self.error
            .as_ref()
            .and_then(|e| e.message(self.output.as_deref()))
    }
}

impl GenerateResult {
    /// The server-reported error, if any
    pub fn error_message(&self) -> Option<String> {
        self.error
            .as_ref()
            .and_then(|e| e.message(self.response.as_deref()))
    }
}

impl Language {
    pub const ALL: [Language; 4] = [
        Language::Python,
        Language::JavaScript,
        Language::Html,
        Language::Css,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::JavaScript => "javascript",
            Self::Html => "html",
            Self::Css => "css",
        }
    }

    /// Guess the language from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "py" => Some(Self::Python),
            "js" | "mjs" | "cjs" => Some(Self::JavaScript),
            "html" | "htm" => Some(Self::Html),
            "css" => Some(Self::Css),
            _ => None,
        }
    }

    /// The next language in selector order, wrapping around
    pub fn next(&self) -> Self {
        let idx = Self::ALL.iter().position(|l| l == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = ParseLanguageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "python" | "py" => Ok(Self::Python),
            "javascript" | "js" => Ok(Self::JavaScript),
            "html" => Ok(Self::Html),
            "css" => Ok(Self::Css),
            _ => Err(ParseLanguageError(s.to_string())),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
