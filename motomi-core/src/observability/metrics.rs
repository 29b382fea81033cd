use crate::error::Result;
use prometheus::{Encoder, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Prometheus metrics for conversation token budgets, labelled by agent
#[derive(Clone)]
pub struct MetricsCollector {
    registry: Arc<Registry>,
    current_tokens: IntGaugeVec,
    warnings: IntCounterVec,
    summarizations: IntCounterVec,
    summarization_failures: IntCounterVec,
    fit_truncations: IntCounterVec,
}

impl MetricsCollector {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let current_tokens = IntGaugeVec::new(
            Opts::new("motomi_conversation_tokens", "Estimated tokens held by a conversation")
                .const_label("component", "conversation"),
            &["agent"],
        )?;

        let warnings = IntCounterVec::new(
            Opts::new("motomi_token_warnings_total", "Conversations that crossed the warning threshold"),
            &["agent"],
        )?;

        let summarizations = IntCounterVec::new(
            Opts::new("motomi_summarizations_total", "Successful history summarizations"),
            &["agent"],
        )?;

        let summarization_failures = IntCounterVec::new(
            Opts::new(
                "motomi_summarization_failures_total",
                "Summarizations that failed or did not shrink history",
            ),
            &["agent"],
        )?;

        let fit_truncations = IntCounterVec::new(
            Opts::new("motomi_fit_truncations_total", "Requests whose history was cut to fit the context"),
            &["agent"],
        )?;

        registry.register(Box::new(current_tokens.clone()))?;
        registry.register(Box::new(warnings.clone()))?;
        registry.register(Box::new(summarizations.clone()))?;
        registry.register(Box::new(summarization_failures.clone()))?;
        registry.register(Box::new(fit_truncations.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            current_tokens,
            warnings,
            summarizations,
            summarization_failures,
            fit_truncations,
        })
    }

    pub fn set_tokens(&self, agent: &str, tokens: usize) {
        self.current_tokens
            .with_label_values(&[agent])
            .set(i64::try_from(tokens).unwrap_or(i64::MAX));
    }

    pub fn record_warning(&self, agent: &str) {
        self.warnings.with_label_values(&[agent]).inc();
    }

    pub fn record_summarization(&self, agent: &str, success: bool) {
        if success {
            self.summarizations.with_label_values(&[agent]).inc();
        } else {
            self.summarization_failures.with_label_values(&[agent]).inc();
        }
    }

    pub fn record_fit_truncation(&self, agent: &str) {
        self.fit_truncations.with_label_values(&[agent]).inc();
    }

    pub fn tokens(&self, agent: &str) -> i64 {
        self.current_tokens.with_label_values(&[agent]).get()
    }

    pub fn summarizations(&self, agent: &str) -> u64 {
        self.summarizations.with_label_values(&[agent]).get()
    }

    pub fn summarization_failures(&self, agent: &str) -> u64 {
        self.summarization_failures.with_label_values(&[agent]).get()
    }

    pub fn fit_truncations(&self, agent: &str) -> u64 {
        self.fit_truncations.with_label_values(&[agent]).get()
    }

    /// Render all metrics in the prometheus text format
    pub fn export(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
