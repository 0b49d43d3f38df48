//! polycode-replay: feed a recorded provider stream through the engine and
//! print the resulting conversation and session state as JSON.
//!
//! ```text
//! polycode-replay --provider claude --submit "fix the tests" claude.ndjson
//! polycode-replay mixed-envelopes.ndjson
//! cat codex.ndjson | polycode-replay --provider codex -
//! ```

mod adapter;
mod transcript;

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use polycode_core::{ContextUsageSnapshot, Engine, EngineConfig, JsonlMessageLoader, Message, ProviderTag, SessionId};
use serde::Serialize;

use crate::adapter::ReplayAdapter;

#[derive(Parser, Debug)]
#[command(name = "polycode-replay")]
#[command(about = "Replay recorded agent provider streams through the polycode engine")]
#[command(version)]
struct Cli {
    /// NDJSON transcript, or "-" for stdin
    transcript: String,

    /// Provider for lines that are raw payloads rather than envelopes
    #[arg(long)]
    provider: Option<ProviderTag>,

    /// Session id for raw payloads and envelopes without one
    #[arg(long, default_value = "replay")]
    session: String,

    /// Engine config file (JSON, camelCase keys)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write raw per-session event logs here
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Submit this text before replaying; repeatable
    #[arg(long)]
    submit: Vec<String>,

    /// Load stored history from <dir>/<session>.jsonl
    #[arg(long)]
    history_dir: Option<PathBuf>,
}

/// Final state of one session.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionReport {
    session_id: String,
    title: Option<String>,
    native_session_id: Option<String>,
    busy: bool,
    status: Option<String>,
    queued: usize,
    submitted: Vec<String>,
    context_usage: Option<ContextUsageSnapshot>,
    messages: Vec<Message>,
}

impl SessionReport {
    fn collect(engine: &Engine, adapter: &ReplayAdapter, session_id: &SessionId) -> Self {
        Self {
            session_id: session_id.to_string(),
            title: engine.title(session_id).map(str::to_string),
            native_session_id: engine.native_session_id(session_id).map(str::to_string),
            busy: engine.is_busy(session_id),
            status: engine.status(session_id).map(str::to_string),
            queued: engine.queued_count(session_id),
            submitted: adapter.submitted(session_id),
            context_usage: engine.context_usage(session_id).cloned(),
            messages: engine.messages(session_id).to_vec(),
        }
    }
}

fn build_config(cli: &Cli) -> anyhow::Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(dir) = &cli.log_dir {
        config.log_dir = Some(dir.clone());
    }
    Ok(config)
}

/// Replay `input` and report every session it touched, in first-seen order.
async fn replay(cli: &Cli, input: impl BufRead) -> anyhow::Result<Vec<SessionReport>> {
    let adapter = Arc::new(ReplayAdapter::new());
    let mut engine = Engine::new(build_config(cli)?, Arc::clone(&adapter));
    if let Some(dir) = &cli.history_dir {
        engine = engine.with_loader(JsonlMessageLoader::new(dir));
    }

    let default_session = SessionId::from(cli.session.as_str());
    engine.activate_session(&default_session).await?;
    let mut seen = vec![default_session.clone()];

    for text in &cli.submit {
        engine.submit(&default_session, text).await?;
    }

    for (index, line) in input.lines().enumerate() {
        let line = line.context("reading transcript")?;
        let event = transcript::parse_line(&line, cli.provider, &default_session)
            .with_context(|| format!("transcript line {}", index + 1))?;
        let Some(event) = event else {
            continue;
        };

        if !seen.contains(&event.session_id) {
            engine.activate_session(&event.session_id).await?;
            seen.push(event.session_id.clone());
        }
        engine
            .on_provider_event(&event.session_id, event.provider, &event.payload)
            .await;
    }

    Ok(seen
        .iter()
        .map(|id| SessionReport::collect(&engine, &adapter, id))
        .collect())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let input: Box<dyn BufRead> = if cli.transcript == "-" {
        Box::new(BufReader::new(io::stdin()))
    } else {
        let file = File::open(&cli.transcript)
            .with_context(|| format!("opening transcript {}", cli.transcript))?;
        Box::new(BufReader::new(file))
    };

    let reports = replay(&cli, input).await?;
    println!("{}", serde_json::to_string_pretty(&reports)?);
    Ok(())
}
