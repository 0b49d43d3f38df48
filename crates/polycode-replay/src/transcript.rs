//! Recorded provider streams.
//!
//! A transcript is NDJSON. Each line is either a raw provider payload, which
//! needs `--provider`, or an envelope naming its own session and provider:
//!
//! ```json
//! {"sessionId":"s1","provider":"claude","payload":{"type":"result","result":"Done"}}
//! ```

use polycode_core::{ProviderTag, SessionId};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum TranscriptError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("raw payload without --provider")]
    MissingProvider,
}

/// One payload to feed into the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayEvent {
    pub session_id: SessionId,
    pub provider: ProviderTag,
    pub payload: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    #[serde(default, alias = "session_id")]
    session_id: Option<String>,
    provider: ProviderTag,
    payload: Value,
}

fn is_envelope(value: &Value) -> bool {
    value.get("provider").is_some_and(Value::is_string) && value.get("payload").is_some()
}

/// Parse one transcript line. Blank lines yield `None`.
pub fn parse_line(
    line: &str,
    default_provider: Option<ProviderTag>,
    default_session: &SessionId,
) -> Result<Option<ReplayEvent>, TranscriptError> {
    if line.trim().is_empty() {
        return Ok(None);
    }

    let value: Value = serde_json::from_str(line)?;

    if is_envelope(&value) {
        let envelope: Envelope = serde_json::from_value(value)?;
        return Ok(Some(ReplayEvent {
            session_id: envelope
                .session_id
                .map(SessionId::from)
                .unwrap_or_else(|| default_session.clone()),
            provider: envelope.provider,
            payload: envelope.payload,
        }));
    }

    let provider = default_provider.ok_or(TranscriptError::MissingProvider)?;
    Ok(Some(ReplayEvent {
        session_id: default_session.clone(),
        provider,
        payload: value,
    }))
}
