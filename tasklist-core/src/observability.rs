//! Logging setup and the request observability sink
//!
//! Diagnostics go through `tracing`. Request lifecycles are additionally
//! reported to an [`ObservabilitySink`]: one record when a request starts,
//! one for a failure and one for every final response. Recording is
//! fire-and-forget and never affects the response.

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::Span;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str = "tasklist=info,tasklist_core=info,tower_http=info";

/// Initialize tracing with environment-based configuration
///
/// Returns without changing anything if a global subscriber is already set.
pub fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let fmt_layer = fmt::layer().with_target(true).with_line_number(true);

    let _ = Registry::default().with(env_filter).with(fmt_layer).try_init();
}

/// Create a span for a single API request
#[inline]
pub fn request_span(method: &str, path: &str, request_id: &str) -> Span {
    tracing::info_span!(
        "request",
        method = %method,
        path = %path,
        request_id = %request_id,
        status = tracing::field::Empty,
    )
}

/// One observation about a request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ObservabilityRecord {
    /// The inbound event and its upstream context
    Request { event: Value, context: Value },
    /// A failure raised by any stage
    Error {
        status: u16,
        message: String,
        causes: Vec<String>,
    },
    /// The response returned to the client
    Response {
        status: u16,
        headers: BTreeMap<String, String>,
        body: String,
    },
}

/// Receiver of request observations
pub trait ObservabilitySink: Send + Sync {
    /// Record an observation; must not block or fail
    fn record(&self, record: ObservabilityRecord);
}

/// Sink that emits each record as a structured `tracing` event
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ObservabilitySink for TracingSink {
    fn record(&self, record: ObservabilityRecord) {
        let payload = serde_json::to_string(&record).unwrap_or_default();
        match &record {
            ObservabilityRecord::Request { .. } => {
                tracing::info!(target: "tasklist_core::requests", record = %payload, "request received")
            }
            ObservabilityRecord::Error { status, .. } if *status >= 500 => {
                tracing::error!(target: "tasklist_core::requests", record = %payload, "request failed")
            }
            ObservabilityRecord::Error { .. } => {
                tracing::warn!(target: "tasklist_core::requests", record = %payload, "request rejected")
            }
            ObservabilityRecord::Response { status, .. } => {
                Span::current().record("status", *status);
                tracing::info!(target: "tasklist_core::requests", record = %payload, "response sent")
            }
        }
    }
}

/// Sink that keeps records in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<ObservabilityRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<ObservabilityRecord> {
        self.records.lock().clone()
    }

    pub fn errors(&self) -> Vec<ObservabilityRecord> {
        self.records
            .lock()
            .iter()
            .filter(|record| matches!(record, ObservabilityRecord::Error { .. }))
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl ObservabilitySink for MemorySink {
    fn record(&self, record: ObservabilityRecord) {
        self.records.lock().push(record);
    }
}
