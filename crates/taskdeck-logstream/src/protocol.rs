//! Inbound log feed protocol.
//!
//! The backend pushes UTF-8 JSON text frames shaped as `{"type": ...}`
//! envelopes. Unknown envelope types are ignored so older clients survive
//! server additions; structurally broken payloads are protocol errors and the
//! session drops them one at a time.

use crate::error::{ClientError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Task identifier as issued by the task resource. Always positive.
pub type TaskId = u64;

/// Outbound liveness probe payload.
pub const HEARTBEAT_PROBE: &str = "ping";

/// Severity of one log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
    Debug,
}

impl LogLevel {
    /// Wire name, as carried in the `level` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Debug => "debug",
        }
    }

    /// Fixed-width display label used by the console and the export artifact.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARN",
            Self::Error => "ERROR",
            Self::Debug => "DEBUG",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "info" => Some(Self::Info),
            "warning" => Some(Self::Warning),
            "error" => Some(Self::Error),
            "debug" => Some(Self::Debug),
            _ => None,
        }
    }
}

/// Feed message received from the streaming endpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedMessage {
    /// Server acknowledgement sent once per accepted connection.
    Connected {
        task_id: Option<TaskId>,
        message: String,
    },
    /// One structured log record.
    Log {
        level: LogLevel,
        message: String,
        extra: Map<String, Value>,
    },
    /// Reply to the client heartbeat probe. Carries nothing.
    Pong,
}

/// Parse a feed JSON text frame into a typed feed message.
///
/// Returns `Ok(None)` for well-formed envelopes of an unknown type.
pub fn parse_feed_message(text: &str) -> Result<Option<FeedMessage>> {
    let value: Value = serde_json::from_str(text)?;
    let object = value
        .as_object()
        .ok_or_else(|| ClientError::Protocol("expected JSON object feed message".to_string()))?;

    let kind = object
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| ClientError::Protocol("missing feed message type".to_string()))?;

    match kind {
        "connected" => {
            let task_id = match object.get("task_id") {
                None | Some(Value::Null) => None,
                Some(value) => Some(value.as_u64().ok_or_else(|| {
                    ClientError::Protocol("invalid connected task id".to_string())
                })?),
            };
            let message = object
                .get("message")
                .and_then(Value::as_str)
                .ok_or_else(|| ClientError::Protocol("invalid connected message text".to_string()))?
                .to_string();
            Ok(Some(FeedMessage::Connected { task_id, message }))
        }
        "log" => {
            let level_text = object
                .get("level")
                .and_then(Value::as_str)
                .ok_or_else(|| ClientError::Protocol("missing log level".to_string()))?;
            let level = LogLevel::parse(level_text).ok_or_else(|| {
                ClientError::Protocol(format!("unknown log level: {level_text}"))
            })?;
            let message = object
                .get("message")
                .and_then(Value::as_str)
                .ok_or_else(|| ClientError::Protocol("invalid log message text".to_string()))?
                .to_string();
            let extra = match object.get("extra") {
                None | Some(Value::Null) => Map::new(),
                Some(value) => value
                    .as_object()
                    .ok_or_else(|| ClientError::Protocol("invalid log extra object".to_string()))?
                    .clone(),
            };
            Ok(Some(FeedMessage::Log {
                level,
                message,
                extra,
            }))
        }
        "pong" => Ok(Some(FeedMessage::Pong)),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_known_message_kinds() -> Result<()> {
        let parsed = parse_feed_message(
            r#"{"type":"connected","task_id":42,"message":"Log stream connected"}"#,
        )?;
        assert_eq!(
            parsed,
            Some(FeedMessage::Connected {
                task_id: Some(42),
                message: "Log stream connected".to_string(),
            })
        );

        let parsed = parse_feed_message(r#"{"type":"connected","message":"ready"}"#)?;
        assert_eq!(
            parsed,
            Some(FeedMessage::Connected {
                task_id: None,
                message: "ready".to_string(),
            })
        );

        let parsed = parse_feed_message(
            r#"{"type":"log","level":"error","message":"boom","extra":{"code":500}}"#,
        )?;
        let mut extra = Map::new();
        extra.insert("code".to_string(), json!(500));
        assert_eq!(
            parsed,
            Some(FeedMessage::Log {
                level: LogLevel::Error,
                message: "boom".to_string(),
                extra,
            })
        );

        let parsed = parse_feed_message(r#"{"type":"log","level":"debug","message":"probe"}"#)?;
        assert_eq!(
            parsed,
            Some(FeedMessage::Log {
                level: LogLevel::Debug,
                message: "probe".to_string(),
                extra: Map::new(),
            })
        );

        let parsed = parse_feed_message(r#"{"type":"pong"}"#)?;
        assert_eq!(parsed, Some(FeedMessage::Pong));

        Ok(())
    }

    #[test]
    fn parse_unknown_message_kind_returns_none() -> Result<()> {
        let parsed = parse_feed_message(r#"{"type":"status_update","state":"running"}"#)?;
        assert!(parsed.is_none());
        Ok(())
    }

    #[test]
    fn parse_malformed_structures() {
        struct Case {
            name: &'static str,
            input: &'static str,
            expected_error_fragment: &'static str,
        }

        let cases = vec![
            Case {
                name: "non-object payload",
                input: r#"["log","error"]"#,
                expected_error_fragment: "expected JSON object feed message",
            },
            Case {
                name: "missing type",
                input: r#"{"level":"info","message":"hi"}"#,
                expected_error_fragment: "missing feed message type",
            },
            Case {
                name: "type is not string",
                input: r#"{"type":7}"#,
                expected_error_fragment: "missing feed message type",
            },
            Case {
                name: "connected missing message",
                input: r#"{"type":"connected","task_id":1}"#,
                expected_error_fragment: "invalid connected message text",
            },
            Case {
                name: "connected task id type",
                input: r#"{"type":"connected","task_id":"42","message":"ready"}"#,
                expected_error_fragment: "invalid connected task id",
            },
            Case {
                name: "log missing level",
                input: r#"{"type":"log","message":"hi"}"#,
                expected_error_fragment: "missing log level",
            },
            Case {
                name: "log unknown level",
                input: r#"{"type":"log","level":"fatal","message":"hi"}"#,
                expected_error_fragment: "unknown log level: fatal",
            },
            Case {
                name: "log missing message",
                input: r#"{"type":"log","level":"info"}"#,
                expected_error_fragment: "invalid log message text",
            },
            Case {
                name: "log extra type",
                input: r#"{"type":"log","level":"info","message":"hi","extra":[1,2]}"#,
                expected_error_fragment: "invalid log extra object",
            },
        ];

        for case in cases {
            let result = parse_feed_message(case.input);
            assert!(result.is_err(), "{}: expected an error", case.name);

            if let Err(error) = result {
                let rendered = error.to_string();
                assert!(
                    rendered.contains(case.expected_error_fragment),
                    "{}: expected error fragment '{}' in '{}'",
                    case.name,
                    case.expected_error_fragment,
                    rendered
                );
            }
        }
    }

    #[test]
    fn parse_null_extra_defaults_to_empty() -> Result<()> {
        let parsed =
            parse_feed_message(r#"{"type":"log","level":"info","message":"hi","extra":null}"#)?;
        assert_eq!(
            parsed,
            Some(FeedMessage::Log {
                level: LogLevel::Info,
                message: "hi".to_string(),
                extra: Map::new(),
            })
        );
        Ok(())
    }

    #[test]
    fn level_labels_match_console_rendering() {
        assert_eq!(LogLevel::Info.label(), "INFO");
        assert_eq!(LogLevel::Warning.label(), "WARN");
        assert_eq!(LogLevel::Error.label(), "ERROR");
        assert_eq!(LogLevel::Debug.label(), "DEBUG");

        assert_eq!(LogLevel::Warning.as_str(), "warning");
    }
}
