//! Provider event classification.
//!
//! Each provider (Codex, Claude, Gemini) speaks its own streaming wire
//! format. Its submodule turns one raw payload into the shared
//! [`Classification`] type; [`classify`] dispatches on the [`ProviderTag`].

pub mod claude;
pub mod codex;
pub mod display;
pub mod event;
pub mod gemini;
pub mod tools;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use claude::ToolCallBuffer;
pub use event::{Classification, MergeMode, ParsedUpdate, StatusHint, TitleHint};

/// Which wire format a payload is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderTag {
    /// JSON-RPC notifications (`method` + `params`).
    Codex,

    /// stream-json block events, optionally in a `stream_event` envelope.
    Claude,

    /// Flat delta/phase objects.
    Gemini,
}

impl ProviderTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderTag::Codex => "codex",
            ProviderTag::Claude => "claude",
            ProviderTag::Gemini => "gemini",
        }
    }
}

impl fmt::Display for ProviderTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown provider: {0}")]
pub struct UnknownProvider(pub String);

impl FromStr for ProviderTag {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "codex" => Ok(ProviderTag::Codex),
            "claude" => Ok(ProviderTag::Claude),
            "gemini" => Ok(ProviderTag::Gemini),
            _ => Err(UnknownProvider(s.to_string())),
        }
    }
}

/// Per-session state threaded through the classifiers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassifierState {
    /// The tool call currently being assembled from argument fragments.
    pub tool_buffer: Option<ToolCallBuffer>,

    /// Final answer text for this turn has already reached the conversation
    /// (via deltas or a one-shot message), so a `result` must not repeat it.
    pub final_text_reflected: bool,

    /// Block-level stream events were seen this turn; one-shot `assistant`
    /// snapshots then carry nothing new.
    pub streaming: bool,
}

impl ClassifierState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything tied to the current turn.
    pub fn reset_turn(&mut self) {
        self.tool_buffer = None;
        self.final_text_reflected = false;
        self.streaming = false;
    }
}

/// Classify one raw payload. Never fails: unknown shapes come back empty.
pub fn classify(provider: ProviderTag, payload: &Value, state: &mut ClassifierState) -> Classification {
    if !payload.is_object() {
        log::debug!("{provider}: ignored non-object payload");
        return Classification::empty();
    }
    let classification = match provider {
        ProviderTag::Codex => codex::classify(payload),
        ProviderTag::Claude => claude::classify(payload, state),
        ProviderTag::Gemini => gemini::classify(payload),
    };
    if classification.is_empty() {
        log::debug!("{provider}: ignored payload {}", display::compact_json(payload, 160));
    }
    classification
}
