/// Token budget configuration and usage tracking

use crate::context::token_counter::{token_limit, DEFAULT_MODEL};
use crate::error::{MotomiError, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_RESPONSE_BUFFER: usize = 1000;
pub const DEFAULT_WARNING_THRESHOLD: f64 = 0.8;
pub const DEFAULT_SUMMARIZE_THRESHOLD: f64 = 0.9;

/// Accepted ranges for runtime budget updates
const MIN_UPDATE_MAX_TOKENS: usize = 1000;
const WARNING_UPDATE_RANGE: (f64, f64) = (0.1, 0.95);
const SUMMARIZE_UPDATE_RANGE: (f64, f64) = (0.2, 0.98);

/// Per-model token ceiling and thresholds.
///
/// Thresholds are fractions of the usable ceiling (`max_tokens` minus the
/// response buffer), with `0 < warning < summarize < 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenBudget {
    model: String,
    max_tokens: usize,
    response_buffer: usize,
    warning_threshold: f64,
    summarize_threshold: f64,
}

impl TokenBudget {
    pub fn new(
        model: impl Into<String>,
        max_tokens: Option<usize>,
        response_buffer: usize,
        warning_threshold: f64,
        summarize_threshold: f64,
    ) -> Result<Self> {
        let model = model.into();
        let max_tokens = max_tokens.unwrap_or_else(|| token_limit(&model));

        let budget = Self {
            model,
            max_tokens,
            response_buffer,
            warning_threshold,
            summarize_threshold,
        };
        budget.validate()?;
        Ok(budget)
    }

    /// Budget with default buffer and thresholds for `model`
    pub fn for_model(model: impl Into<String>) -> Self {
        let model = model.into();
        let max_tokens = token_limit(&model);
        Self {
            model,
            max_tokens,
            response_buffer: DEFAULT_RESPONSE_BUFFER.min(max_tokens / 2),
            warning_threshold: DEFAULT_WARNING_THRESHOLD,
            summarize_threshold: DEFAULT_SUMMARIZE_THRESHOLD,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_tokens == 0 {
            return Err(MotomiError::InvalidConfig("max_tokens must be positive".to_string()));
        }
        if self.response_buffer >= self.max_tokens {
            return Err(MotomiError::InvalidConfig(format!(
                "response buffer {} must be smaller than max_tokens {}",
                self.response_buffer, self.max_tokens
            )));
        }
        if !(self.warning_threshold > 0.0
            && self.warning_threshold < self.summarize_threshold
            && self.summarize_threshold < 1.0)
        {
            return Err(MotomiError::InvalidConfig(format!(
                "thresholds must satisfy 0 < warning ({}) < summarize ({}) < 1",
                self.warning_threshold, self.summarize_threshold
            )));
        }
        Ok(())
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    pub fn response_buffer(&self) -> usize {
        self.response_buffer
    }

    pub fn warning_threshold(&self) -> f64 {
        self.warning_threshold
    }

    pub fn summarize_threshold(&self) -> f64 {
        self.summarize_threshold
    }

    /// Tokens available for the request itself
    pub fn usable_tokens(&self) -> usize {
        self.max_tokens.saturating_sub(self.response_buffer)
    }

    pub fn warning_tokens(&self) -> f64 {
        self.usable_tokens() as f64 * self.warning_threshold
    }

    pub fn summarize_tokens(&self) -> f64 {
        self.usable_tokens() as f64 * self.summarize_threshold
    }

    /// Apply a runtime update. Returns whether anything changed.
    ///
    /// Values outside the accepted ranges are rejected and leave the budget
    /// untouched.
    pub fn apply(&mut self, update: &BudgetUpdate) -> Result<bool> {
        let mut next = self.clone();

        if let Some(max_tokens) = update.max_tokens {
            if max_tokens <= MIN_UPDATE_MAX_TOKENS {
                return Err(MotomiError::InvalidConfig(format!(
                    "max_tokens must exceed {}, got {}",
                    MIN_UPDATE_MAX_TOKENS, max_tokens
                )));
            }
            next.max_tokens = max_tokens;
        }
        if let Some(warning) = update.warning_threshold {
            check_range("warning_threshold", warning, WARNING_UPDATE_RANGE)?;
            next.warning_threshold = warning;
        }
        if let Some(summarize) = update.summarize_threshold {
            check_range("summarize_threshold", summarize, SUMMARIZE_UPDATE_RANGE)?;
            next.summarize_threshold = summarize;
        }

        next.validate()?;
        let changed = next != *self;
        *self = next;
        Ok(changed)
    }
}

impl Default for TokenBudget {
    fn default() -> Self {
        Self::for_model(DEFAULT_MODEL)
    }
}

fn check_range(name: &str, value: f64, (low, high): (f64, f64)) -> Result<()> {
    if (low..=high).contains(&value) {
        Ok(())
    } else {
        Err(MotomiError::InvalidConfig(format!(
            "{} must be within [{}, {}], got {}",
            name, low, high, value
        )))
    }
}

/// Partial budget settings changed at runtime
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BudgetUpdate {
    pub max_tokens: Option<usize>,
    pub warning_threshold: Option<f64>,
    pub summarize_threshold: Option<f64>,
}

/// Running token counters. Both flags are sticky until [`UsageState::reset`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageState {
    current_tokens: usize,
    warning_issued: bool,
    summarization_performed: bool,
}

impl UsageState {
    pub fn current_tokens(&self) -> usize {
        self.current_tokens
    }

    pub fn warning_issued(&self) -> bool {
        self.warning_issued
    }

    pub fn summarization_performed(&self) -> bool {
        self.summarization_performed
    }

    /// Apply a signed token delta and re-check the warning threshold.
    ///
    /// Returns true when this call is the one that raised the warning.
    pub fn apply_delta(&mut self, delta: i64, budget: &TokenBudget) -> bool {
        self.current_tokens = if delta >= 0 {
            self.current_tokens.saturating_add(delta as usize)
        } else {
            self.current_tokens.saturating_sub(delta.unsigned_abs() as usize)
        };
        self.check_warning(budget)
    }

    pub fn add(&mut self, tokens: usize, budget: &TokenBudget) -> bool {
        self.current_tokens = self.current_tokens.saturating_add(tokens);
        self.check_warning(budget)
    }

    pub(crate) fn check_warning(&mut self, budget: &TokenBudget) -> bool {
        if !self.warning_issued && self.current_tokens as f64 >= budget.warning_tokens() {
            self.warning_issued = true;
            return true;
        }
        false
    }

    pub fn should_summarize(&self, budget: &TokenBudget) -> bool {
        !self.summarization_performed && self.current_tokens as f64 >= budget.summarize_tokens()
    }

    pub fn mark_summarized(&mut self) {
        self.summarization_performed = true;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn status(&self, budget: &TokenBudget) -> TokenStatus {
        let usage_percent = if budget.max_tokens() > 0 {
            self.current_tokens as f64 / budget.max_tokens() as f64 * 100.0
        } else {
            0.0
        };

        TokenStatus {
            current_tokens: self.current_tokens,
            max_tokens: budget.max_tokens(),
            usage_percent,
            warning_threshold: budget.warning_threshold() * 100.0,
            summarize_threshold: budget.summarize_threshold() * 100.0,
            warning_issued: self.warning_issued,
            summarization_performed: self.summarization_performed,
        }
    }
}

/// Snapshot of a conversation's token usage. Percentages are on a 0-100 scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenStatus {
    pub current_tokens: usize,
    pub max_tokens: usize,
    pub usage_percent: f64,
    pub warning_threshold: f64,
    pub summarize_threshold: f64,
    pub warning_issued: bool,
    pub summarization_performed: bool,
}
