//! Conversation merge engine.
//!
//! Folds [`ParsedUpdate`]s into a session's message list. Only the last
//! message is ever touched in place; everything else is an append. The
//! returned [`MergeOutcome`] lets observers skip work when nothing changed.

use crate::agents::event::{MergeMode, ParsedUpdate};

use super::message::Message;

/// How many trailing messages a `NewEntry` update is checked against.
///
/// Providers occasionally redeliver identical completed-item notifications;
/// this window absorbs them. Tunable through `EngineConfig::dedup_window`.
pub const DEFAULT_DEDUP_WINDOW: usize = 8;

/// The effect of one merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The list was not modified.
    Unchanged,

    /// A new message was pushed.
    Appended,

    /// The last message's content was replaced or extended.
    UpdatedLast,
}

impl MergeOutcome {
    pub fn changed(self) -> bool {
        self != MergeOutcome::Unchanged
    }
}

/// Apply a single update to `messages`.
///
/// Updates with empty content never change the list.
pub fn merge(
    messages: &mut Vec<Message>,
    session_id: &str,
    update: &ParsedUpdate,
    dedup_window: usize,
) -> MergeOutcome {
    if update.content.is_empty() {
        return MergeOutcome::Unchanged;
    }

    let last_matches = messages
        .last()
        .is_some_and(|last| last.is_kind(update.role, update.message_type));

    match update.mode {
        MergeMode::Append => match messages.last_mut().filter(|_| last_matches) {
            Some(last) => {
                last.content.push_str(&update.content);
                MergeOutcome::UpdatedLast
            }
            None => push(messages, session_id, update),
        },

        MergeMode::ReplaceOrCreate => match messages.last_mut().filter(|_| last_matches) {
            Some(last) if last.content == update.content => MergeOutcome::Unchanged,
            Some(last) => {
                last.content.clone_from(&update.content);
                MergeOutcome::UpdatedLast
            }
            None => push(messages, session_id, update),
        },

        MergeMode::NewEntry => {
            let start = messages.len().saturating_sub(dedup_window);
            let duplicate = messages[start..].iter().any(|m| {
                m.is_kind(update.role, update.message_type) && m.content == update.content
            });
            if duplicate {
                log::debug!(
                    "Suppressed duplicate {:?} entry for session {}",
                    update.message_type,
                    session_id
                );
                MergeOutcome::Unchanged
            } else {
                push(messages, session_id, update)
            }
        }
    }
}

/// Apply updates in order. Returns true if any of them changed the list.
pub fn merge_all(
    messages: &mut Vec<Message>,
    session_id: &str,
    updates: &[ParsedUpdate],
    dedup_window: usize,
) -> bool {
    updates.iter().fold(false, |changed, update| {
        merge(messages, session_id, update, dedup_window).changed() || changed
    })
}

fn push(messages: &mut Vec<Message>, session_id: &str, update: &ParsedUpdate) -> MergeOutcome {
    messages.push(Message::new(
        session_id,
        update.role,
        update.message_type,
        update.content.clone(),
    ));
    MergeOutcome::Appended
}
