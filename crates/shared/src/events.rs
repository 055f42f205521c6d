//! Events emitted by a streaming command execution.
//!
//! A stream is zero or more [`ExecEvent::Output`] followed by exactly one
//! terminal [`ExecEvent::Done`] or [`ExecEvent::Error`]. Over the wire the
//! command server sends them as Server-Sent Events whose `event:` field is
//! the variant name and whose `data:` field is the JSON payload.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ExecEvent {
    /// A piece of combined stdout/stderr
    Output {
        text: String,
        #[serde(default, rename = "isError")]
        is_error: bool,
    },
    /// Process exited
    Done {
        #[serde(rename = "exitCode")]
        exit_code: i32,
    },
    /// Process could not run or the transport failed
    Error { text: String },
}

#[derive(Deserialize)]
struct OutputData {
    text: String,
    #[serde(default, rename = "isError")]
    is_error: bool,
}

#[derive(Deserialize)]
struct DoneData {
    #[serde(rename = "exitCode")]
    exit_code: i32,
}

#[derive(Deserialize)]
struct ErrorData {
    text: String,
}

impl ExecEvent {
    pub fn output(text: impl Into<String>) -> Self {
        ExecEvent::Output {
            text: text.into(),
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        ExecEvent::Error { text: text.into() }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ExecEvent::Output { .. })
    }

    /// SSE event name for this variant.
    pub fn name(&self) -> &'static str {
        match self {
            ExecEvent::Output { .. } => "output",
            ExecEvent::Done { .. } => "done",
            ExecEvent::Error { .. } => "error",
        }
    }

    /// Decode one SSE event. Unknown names and malformed payloads give `None`.
    pub fn from_sse(event: &str, data: &str) -> Option<Self> {
        match event {
            "output" => serde_json::from_str::<OutputData>(data)
                .ok()
                .map(|d| ExecEvent::Output {
                    text: d.text,
                    is_error: d.is_error,
                }),
            "done" => serde_json::from_str::<DoneData>(data)
                .ok()
                .map(|d| ExecEvent::Done {
                    exit_code: d.exit_code,
                }),
            "error" => serde_json::from_str::<ErrorData>(data)
                .ok()
                .map(|d| ExecEvent::Error { text: d.text }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_sse() {
        assert_eq!(
            ExecEvent::from_sse("output", r#"{"text":"hi\n","isError":true}"#),
            Some(ExecEvent::Output {
                text: "hi\n".into(),
                is_error: true
            })
        );
        assert_eq!(
            ExecEvent::from_sse("output", r#"{"text":"x"}"#),
            Some(ExecEvent::output("x"))
        );
        assert_eq!(
            ExecEvent::from_sse("done", r#"{"exitCode":2}"#),
            Some(ExecEvent::Done { exit_code: 2 })
        );
        assert_eq!(
            ExecEvent::from_sse("error", r#"{"text":"spawn failed"}"#),
            Some(ExecEvent::error("spawn failed"))
        );
        assert_eq!(ExecEvent::from_sse("ping", "{}"), None);
        assert_eq!(ExecEvent::from_sse("done", "not json"), None);
    }

    #[test]
    fn test_terminal() {
        assert!(!ExecEvent::output("x").is_terminal());
        assert!(ExecEvent::Done { exit_code: 0 }.is_terminal());
        assert!(ExecEvent::error("x").is_terminal());
    }
}
