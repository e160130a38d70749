use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub timestamp: String,
    pub event_type: String,
    pub dispatch_id: String,
    pub order_id: Option<u64>,
    pub message_id: Option<String>,
    pub diagnostic: Option<String>,
}

impl AuditEvent {
    pub fn new(event_type: &str, dispatch_id: &str) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            event_type: event_type.to_string(),
            dispatch_id: dispatch_id.to_string(),
            order_id: None,
            message_id: None,
            diagnostic: None,
        }
    }

    pub fn with_order(mut self, order_id: Option<u64>) -> Self {
        self.order_id = order_id;
        self
    }

    pub fn with_message_id(mut self, message_id: String) -> Self {
        self.message_id = Some(message_id);
        self
    }

    pub fn with_diagnostic(mut self, diagnostic: String) -> Self {
        self.diagnostic = Some(diagnostic);
        self
    }
}

/// Append-only JSONL trail of dispatch attempts and outcomes.
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn default_path() -> Self {
        Self::new("dispatch-audit.jsonl")
    }

    pub fn record(&self, event: &AuditEvent) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let json = serde_json::to_string(event)?;
        writeln!(file, "{}", json)?;
        tracing::debug!(event_type=%event.event_type, dispatch_id=%event.dispatch_id, "Audit event written");
        Ok(())
    }
}
