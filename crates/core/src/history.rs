//! Bounded conversation history.
//!
//! The history is an ordered, append-only log of [`Turn`]s with one
//! exception: when the estimated size exceeds the configured budget, the
//! oldest non-pinned turns are dropped from the front. This is a lossy,
//! oldest-first policy; nothing is summarized.
//!
//! A System turn at index 0 is *pinned*: eviction and [`ConversationHistory::clear`]
//! never remove it.

use crate::error::HistoryError;
use crate::message::{Role, Turn};
use std::fmt::Write as _;
use std::path::Path;
use tracing::debug;

/// Default budget, in estimated tokens.
pub const DEFAULT_BUDGET: usize = 16_000;

/// Per-turn overhead for role markers and delimiters in the rendered prompt.
const TURN_OVERHEAD: usize = 4;

/// Estimate the token count for a string.
///
/// Heuristic: 1 token ≈ 4 bytes. Rounds up. Only a monotonic proxy for
/// prompt cost; it matches no particular tokenizer.
pub fn estimate_tokens(text: &str) -> usize {
    text.len().div_ceil(4)
}

/// Estimate tokens for a single turn including per-turn overhead.
pub fn estimate_turn_tokens(turn: &Turn) -> usize {
    TURN_OVERHEAD + estimate_tokens(&turn.text)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationHistory {
    turns: Vec<Turn>,
    budget: usize,
}

impl ConversationHistory {
    /// Create an empty history with the given token budget.
    pub fn new(budget: usize) -> Self {
        Self {
            turns: Vec::new(),
            budget,
        }
    }

    /// Create a history whose first turn is a pinned system prompt.
    pub fn with_system(system_prompt: impl Into<String>, budget: usize) -> Self {
        let mut history = Self::new(budget);
        history.set_system(system_prompt);
        history
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    /// Change the budget. Takes effect on the next append.
    pub fn set_budget(&mut self, budget: usize) {
        self.budget = budget;
    }

    /// Install or replace the pinned system turn.
    pub fn set_system(&mut self, text: impl Into<String>) {
        let turn = Turn::system(text);
        if self.pinned().is_some() {
            self.turns[0] = turn;
        } else {
            self.turns.insert(0, turn);
        }
    }

    /// The pinned system turn, if any.
    pub fn pinned(&self) -> Option<&Turn> {
        self.turns.first().filter(|t| t.role == Role::System)
    }

    /// Add a turn to the end, then enforce the budget.
    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
        self.enforce_budget();
    }

    /// Approximate prompt cost of all turns.
    pub fn estimate_size(&self) -> usize {
        self.turns.iter().map(estimate_turn_tokens).sum()
    }

    /// Remove every turn except the pinned system turn.
    pub fn clear(&mut self) {
        let pinned = self.pinned().cloned();
        self.turns.clear();
        self.turns.extend(pinned);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Evict until the estimate fits or only two turns remain.
    ///
    /// Each pass removes the oldest turn after the pinned one, so a single
    /// oversized turn may still leave the history over budget once two
    /// turns remain.
    fn enforce_budget(&mut self) {
        let mut evicted = 0usize;
        while self.estimate_size() > self.budget && self.turns.len() > 2 {
            let index = usize::from(self.pinned().is_some());
            self.turns.remove(index);
            evicted += 1;
        }
        if evicted > 0 {
            debug!(
                evicted,
                remaining = self.turns.len(),
                estimated = self.estimate_size(),
                budget = self.budget,
                "Evicted oldest turns to fit budget"
            );
        }
    }

    /// Render a human-readable transcript.
    pub fn format(&self) -> String {
        let mut out = String::new();
        for turn in &self.turns {
            let _ = write!(out, "[{}] {}\n\n", turn.role.label(), turn.text);
        }
        out
    }

    // ── Persistence ─────────────────────────────────────────────────────

    /// Serialize to the line format: `role\n<byte length>\n<content>\n` per turn.
    ///
    /// Image attachments and tool ids are not persisted.
    pub fn to_persisted(&self) -> String {
        let mut out = String::new();
        for turn in &self.turns {
            let _ = write!(out, "{}\n{}\n{}\n", turn.role, turn.text.len(), turn.text);
        }
        out
    }

    /// Parse the line format produced by [`Self::to_persisted`].
    ///
    /// Turns are restored verbatim; the budget is not enforced on load.
    pub fn from_persisted(data: &str, budget: usize) -> Result<Self, HistoryError> {
        let mut turns = Vec::new();
        let mut rest = data;
        let mut record = 0usize;

        loop {
            rest = rest.trim_start_matches('\n');
            if rest.is_empty() {
                break;
            }
            record += 1;
            let corrupt = |reason: String| HistoryError::Corrupt { record, reason };

            let (role_line, after_role) = rest
                .split_once('\n')
                .ok_or_else(|| corrupt("missing role line".into()))?;
            let role: Role = role_line.trim().parse().map_err(corrupt)?;

            let (len_line, after_len) = after_role
                .split_once('\n')
                .ok_or_else(|| corrupt("missing length line".into()))?;
            let len: usize = len_line
                .trim()
                .parse()
                .map_err(|e| corrupt(format!("invalid length '{len_line}': {e}")))?;

            let text = after_len
                .get(..len)
                .ok_or_else(|| corrupt(format!("content shorter than {len} bytes")))?;
            let tail = &after_len[len..];
            rest = tail
                .strip_prefix('\n')
                .ok_or_else(|| corrupt("content not terminated by newline".into()))?;

            turns.push(Turn {
                role,
                text: text.to_string(),
                images: Vec::new(),
                tool_name: None,
                call_id: None,
            });
        }

        Ok(Self { turns, budget })
    }

    /// Write the persisted format to `path`.
    pub fn save(&self, path: &Path) -> Result<(), HistoryError> {
        std::fs::write(path, self.to_persisted()).map_err(|source| HistoryError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read a history previously written by [`Self::save`].
    pub fn load(path: &Path, budget: usize) -> Result<Self, HistoryError> {
        let data = std::fs::read_to_string(path).map_err(|source| HistoryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_persisted(&data, budget)
    }
}

impl Default for ConversationHistory {
    fn default() -> Self {
        Self::new(DEFAULT_BUDGET)
    }
}
