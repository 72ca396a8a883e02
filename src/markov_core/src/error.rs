use std::sync::Arc;

/// Errors raised by matrix construction, adjustment and simulation.
///
/// Cloneable so a failed cached build reaches every waiting caller as its
/// own variant.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SimError {
    #[error("not found: {what}")]
    NotFound { what: String },

    #[error("unknown state label: {label}")]
    UnknownState { label: String },

    #[error("invalid count {count} for {state} -> {next_state}")]
    InvalidCount { state: String, next_state: String, count: f64 },

    #[error("rate metric missing: {key}")]
    UnknownRate { key: String },

    #[error("rate metric {key} out of range: {value}")]
    InvalidRate { key: String, value: f64 },

    #[error("invalid adjustment for {state}: {reason}")]
    InvalidAdjustment { state: String, reason: String },

    #[error("dead chain: possession from {start} did not change hands within {steps} steps")]
    DeadChain { start: String, steps: usize },

    #[error("no outgoing transitions for state {state}")]
    MissingRow { state: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("CSV error: {0}")]
    Csv(#[source] Arc<csv::Error>),

    #[error("IO error: {0}")]
    Io(#[source] Arc<std::io::Error>),

    #[error("TOML error: {0}")]
    Toml(#[source] Arc<toml::de::Error>),

    #[error("JSON error: {0}")]
    Json(#[source] Arc<serde_json::Error>),
}

macro_rules! shared_source {
    ($($variant:ident => $source:ty),* $(,)?) => {
        $(
            impl From<$source> for SimError {
                fn from(err: $source) -> Self {
                    SimError::$variant(Arc::new(err))
                }
            }
        )*
    };
}

shared_source! {
    Csv => csv::Error,
    Io => std::io::Error,
    Toml => toml::de::Error,
    Json => serde_json::Error,
}

impl SimError {
    pub fn not_found(what: impl Into<String>) -> Self {
        SimError::NotFound { what: what.into() }
    }

    /// Faults that indicate a malformed matrix rather than bad input.
    pub fn is_chain_fault(&self) -> bool {
        matches!(self, SimError::DeadChain { .. } | SimError::MissingRow { .. })
    }
}

pub type SimResult<T> = Result<T, SimError>;
