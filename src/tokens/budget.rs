//! Context window budgeting
//!
//! Token usage is estimated with a fixed words-per-token heuristic rather
//! than a real tokenizer: the vendor's tokenizer is unknown, and the estimate
//! only has to decide when to drop old history.

use serde::Serialize;
use tracing::{debug, info};

use crate::protocol::{ChatMessage, Role};

/// Fraction of the model context a request may fill
pub const CONTEXT_THRESHOLD_RATIO: f64 = 0.88;

/// Context length assumed for models the catalog does not know
pub const DEFAULT_CONTEXT_LENGTH: u64 = 131_072;

const WORDS_PER_TOKEN: f64 = 0.75;

/// Estimate the token count of `text`.
///
/// Empty text costs nothing; any other text costs at least one token.
pub fn estimate_tokens(text: &str) -> u64 {
    if text.is_empty() {
        return 0;
    }
    let words = text.split_whitespace().count();
    ((words as f64 / WORDS_PER_TOKEN) as u64).max(1)
}

/// Observability record of one budgeting pass
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BudgetInfo {
    pub original_message_count: usize,
    pub current_tokens: u64,
    pub max_tokens: u64,
    pub threshold_tokens: u64,
    pub trimmed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trimmed_message_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trimmed_tokens: Option<u64>,
    /// Set when budgeting could not run; messages are then returned as-is
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Trims conversation history to fit a model's context window
#[derive(Debug, Clone, Copy)]
pub struct ContextBudgeter {
    threshold_ratio: f64,
}

impl Default for ContextBudgeter {
    fn default() -> Self {
        Self {
            threshold_ratio: CONTEXT_THRESHOLD_RATIO,
        }
    }
}

impl ContextBudgeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token budget for a model with the given context length
    pub fn threshold(&self, context_limit: u64) -> u64 {
        (context_limit as f64 * self.threshold_ratio).floor() as u64
    }

    /// Estimated tokens of one message (text parts only)
    pub fn message_tokens(&self, message: &ChatMessage) -> u64 {
        estimate_tokens(&message.text())
    }

    /// Estimated tokens of a message list
    pub fn total_tokens(&self, messages: &[ChatMessage]) -> u64 {
        messages.iter().map(|m| self.message_tokens(m)).sum()
    }

    /// Fit `messages` under the threshold for `context_limit`.
    ///
    /// System messages are always kept and come first in the result. Other
    /// messages are kept newest-first until the next one would overflow; at
    /// least the newest non-system message survives even when it alone is
    /// over budget.
    pub fn budget(
        &self,
        messages: Vec<ChatMessage>,
        context_limit: u64,
    ) -> (Vec<ChatMessage>, BudgetInfo) {
        let current_tokens = self.total_tokens(&messages);
        let threshold_tokens = self.threshold(context_limit);
        let mut info = BudgetInfo {
            original_message_count: messages.len(),
            current_tokens,
            max_tokens: context_limit,
            threshold_tokens,
            ..BudgetInfo::default()
        };

        if context_limit == 0 {
            info.error = Some("model context limit is zero".to_string());
            return (messages, info);
        }

        if current_tokens <= threshold_tokens {
            debug!(current_tokens, threshold_tokens, "Context within budget");
            return (messages, info);
        }

        let (system, others): (Vec<ChatMessage>, Vec<ChatMessage>) =
            messages.into_iter().partition(|m| m.role == Role::System);

        if others.is_empty() {
            return (system, info);
        }

        let mut running = self.total_tokens(&system);
        let mut keep_from = others.len();
        for (index, message) in others.iter().enumerate().rev() {
            let cost = self.message_tokens(message);
            if running + cost > threshold_tokens {
                break;
            }
            running += cost;
            keep_from = index;
        }
        if keep_from == others.len() {
            keep_from = others.len() - 1;
        }

        let mut trimmed = system;
        trimmed.extend(others.into_iter().skip(keep_from));

        info.trimmed = true;
        info.trimmed_message_count = Some(trimmed.len());
        info.trimmed_tokens = Some(self.total_tokens(&trimmed));

        info!(
            from_messages = info.original_message_count,
            to_messages = trimmed.len(),
            current_tokens,
            max_tokens = context_limit,
            threshold_tokens,
            "Trimmed conversation to fit context"
        );

        (trimmed, info)
    }
}
