use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// API usage information returned with a chat completion
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
    /// Cost in USD when the provider reports it (OpenRouter calls it `total_cost`).
    #[serde(default, alias = "total_cost")]
    pub cost: Option<f64>,
}

impl Usage {
    /// Reported cost, or 0.0 when the provider does not report one.
    pub fn cost(&self) -> f64 {
        self.cost.unwrap_or(0.0)
    }
}

/// Running usage totals across every call made during a run.
#[derive(Debug, Default)]
pub struct UsageMeter {
    inner: Mutex<UsageTotals>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct UsageTotals {
    pub calls: u64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub cost_usd: f64,
}

impl UsageMeter {
    pub fn record(&self, usage: Option<&Usage>) {
        let Ok(mut totals) = self.inner.lock() else {
            return;
        };
        totals.calls += 1;
        if let Some(usage) = usage {
            totals.prompt_tokens += u64::from(usage.prompt_tokens);
            totals.completion_tokens += u64::from(usage.completion_tokens);
            totals.cost_usd += usage.cost();
        }
    }

    pub fn totals(&self) -> UsageTotals {
        self.inner.lock().map(|t| *t).unwrap_or_default()
    }
}
