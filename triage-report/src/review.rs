//! Envelopes for the optional remote review proxy.
//!
//! Only the data shapes live here; sending the request is the host's job.

use serde::{Deserialize, Serialize};
use triage_core::{Brand, Mode, TriageContext};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReviewMeta {
    pub country: String,
    pub mode: Mode,
    pub brand: Brand,
}

/// Body posted to the proxy: the rendered summary plus its context.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReviewRequest {
    pub prompt: String,
    pub meta: ReviewMeta,
}

impl ReviewRequest {
    pub fn new(summary: &str, context: &TriageContext) -> Self {
        Self {
            prompt: summary.trim().to_string(),
            meta: ReviewMeta {
                country: context.country.clone(),
                mode: context.mode,
                brand: context.brand,
            },
        }
    }
}

/// Proxy answer: either `{reply}` or `{error}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ReviewReply {
    #[serde(default)]
    pub reply: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ReviewReply {
    /// Reads a proxy body; anything unreadable is treated as an empty reply.
    pub fn parse(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_default()
    }

    /// Text to show the user. Replies are opaque and displayed as-is.
    pub fn display_text(&self) -> String {
        let non_empty = |text: &Option<String>| text.clone().filter(|t| !t.trim().is_empty());
        non_empty(&self.reply)
            .or_else(|| non_empty(&self.error))
            .unwrap_or_else(|| "No reply returned from proxy.".to_string())
    }
}
