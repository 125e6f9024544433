//! Token estimation and context budgeting

pub mod budget;

pub use budget::{
    estimate_tokens, BudgetInfo, ContextBudgeter, CONTEXT_THRESHOLD_RATIO, DEFAULT_CONTEXT_LENGTH,
};
