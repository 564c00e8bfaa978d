//! JSON-lines framing for the harness.
//!
//! Input lines are either a command request `{ "command", "args" }` or a
//! stream control `{ "stream": "listen" | "cancel" }`. Output lines are
//! tagged with the channel they belong to.

use std::io::Write;
use std::sync::Arc;

use bactrack_core::protocol_constants::{EVENT_CHANNEL, METHOD_CHANNEL};
use bactrack_core::{Acknowledgment, BridgeError, CommandRequest, ErrorBody, Event};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Event stream subscription control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamControl {
    Listen,
    Cancel,
}

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum InputLine {
    Stream { stream: StreamControl },
    Command(CommandRequest),
}

/// One output line.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum OutputLine<'a> {
    Result {
        channel: &'static str,
        command: &'a str,
        result: Acknowledgment,
    },
    Error {
        channel: &'static str,
        #[serde(skip_serializing_if = "Option::is_none")]
        command: Option<&'a str>,
        error: ErrorBody,
    },
    Event {
        channel: &'static str,
        event: &'a Event,
    },
}

impl<'a> OutputLine<'a> {
    pub fn reply(command: &'a str, outcome: &Result<Acknowledgment, BridgeError>) -> Self {
        match outcome {
            Ok(result) => Self::Result {
                channel: METHOD_CHANNEL,
                command,
                result: *result,
            },
            Err(e) => Self::Error {
                channel: METHOD_CHANNEL,
                command: Some(command),
                error: ErrorBody::from(e),
            },
        }
    }

    /// Framing error for a line that is neither a command nor a stream control.
    pub fn malformed(message: String) -> Self {
        Self::Error {
            channel: METHOD_CHANNEL,
            command: None,
            error: ErrorBody {
                code: "MALFORMED_REQUEST",
                message,
            },
        }
    }

    pub fn event(event: &'a Event) -> Self {
        Self::Event {
            channel: EVENT_CHANNEL,
            event,
        }
    }
}

/// Line writer shared by the command loop and the delivery thread.
#[derive(Clone)]
pub struct LineWriter {
    out: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl LineWriter {
    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Arc::new(Mutex::new(out)),
        }
    }

    /// Writes one line and flushes. Write failures are logged, not returned;
    /// a closed stdout must not take down the delivery thread.
    pub fn write(&self, line: &OutputLine<'_>) {
        let encoded = match serde_json::to_string(line) {
            Ok(encoded) => encoded,
            Err(e) => {
                log::error!("[Wire] Failed to encode output: {}", e);
                return;
            }
        };

        let mut out = self.out.lock();
        if let Err(e) = writeln!(out, "{}", encoded).and_then(|()| out.flush()) {
            log::warn!("[Wire] Failed to write output: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bactrack_core::EventKind;
    use serde_json::json;

    #[test]
    fn parses_both_input_shapes() {
        let line: InputLine = serde_json::from_str(r#"{"stream":"cancel"}"#).unwrap();
        assert_eq!(
            line,
            InputLine::Stream {
                stream: StreamControl::Cancel
            }
        );

        let line: InputLine =
            serde_json::from_str(r#"{"command":"initialize","args":{"apiKey":"k"}}"#).unwrap();
        assert_eq!(
            line,
            InputLine::Command(CommandRequest::with_args(
                "initialize",
                json!({ "apiKey": "k" })
            ))
        );
    }

    #[test]
    fn reply_lines() {
        let ok = serde_json::to_value(OutputLine::reply(
            "startCountdown",
            &Ok(Acknowledgment::Flag(true)),
        ))
        .unwrap();
        assert_eq!(
            ok,
            json!({ "channel": "bactrack_flutter", "command": "startCountdown", "result": true })
        );

        let err = serde_json::to_value(OutputLine::reply(
            "getSerialNumber",
            &Err(BridgeError::NotInitialized),
        ))
        .unwrap();
        assert_eq!(
            err,
            json!({
                "channel": "bactrack_flutter",
                "command": "getSerialNumber",
                "error": { "code": "NOT_INITIALIZED", "message": "SDK not initialized" }
            })
        );
    }

    #[test]
    fn event_lines_omit_absent_message() {
        let event = Event::new(EventKind::Analyzing);
        let line = serde_json::to_value(OutputLine::event(&event)).unwrap();
        assert_eq!(
            line,
            json!({ "channel": "bactrack_flutter/events", "event": { "state": "analyzing" } })
        );
    }

    #[test]
    fn writer_emits_one_line_per_output() {
        #[derive(Clone, Default)]
        struct Shared(Arc<Mutex<Vec<u8>>>);

        impl Write for Shared {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.0.lock().extend_from_slice(buf);
                Ok(buf.len())
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let buffer = Shared::default();
        let writer = LineWriter::new(Box::new(buffer.clone()));
        let event = Event::with_message(EventKind::Countdown, "3");
        writer.write(&OutputLine::event(&event));
        writer.write(&OutputLine::malformed("bad".into()));

        let text = String::from_utf8(buffer.0.lock().clone()).unwrap();
        assert_eq!(text.lines().count(), 2);
    }
}
