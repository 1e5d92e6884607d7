//! Injectable decision tracing.
//!
//! The engine never prints. When a caller asks for a debug decision it emits
//! structured records to a [`TraceSink`] supplied at construction; the
//! default sink drops everything.

use std::sync::Mutex;

use serde::Serialize;
use serde_json::Value;

// =============================================================================
// Trace Records
// =============================================================================

/// Stage of a decision a trace record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TraceStage {
    /// A policy under the queried key is about to be evaluated.
    PolicyConsidered,

    /// The evaluator descended into a condition node.
    ConditionEntered,

    /// An attribute lookup resolved (possibly to nothing).
    ValueResolved,

    /// The final decision for the query.
    Outcome,
}

/// One structured record emitted during a debug-enabled decision.
#[derive(Debug, Clone, Serialize)]
pub struct TraceRecord {
    /// Stage the record belongs to.
    pub stage: TraceStage,

    /// Stage-specific payload.
    pub payload: Value,
}

// =============================================================================
// Sinks
// =============================================================================

/// Sink receiving trace records.
///
/// Implementations should be cheap; the engine calls them inline on the
/// decision path.
pub trait TraceSink: Send + Sync {
    /// Receive one record.
    fn record(&self, record: TraceRecord);
}

/// Default sink that drops every record.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTraceSink;

impl TraceSink for NoopTraceSink {
    fn record(&self, _record: TraceRecord) {}
}

/// Sink that retains records in memory, for tests and diagnostics.
#[derive(Debug, Default)]
pub struct CollectingTraceSink {
    records: Mutex<Vec<TraceRecord>>,
}

impl CollectingTraceSink {
    /// Create an empty collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the records received so far.
    #[must_use]
    pub fn records(&self) -> Vec<TraceRecord> {
        self.records.lock().expect("trace sink poisoned").clone()
    }

    /// Drain the received records.
    #[must_use]
    pub fn take(&self) -> Vec<TraceRecord> {
        std::mem::take(&mut *self.records.lock().expect("trace sink poisoned"))
    }
}

impl TraceSink for CollectingTraceSink {
    fn record(&self, record: TraceRecord) {
        self.records.lock().expect("trace sink poisoned").push(record);
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_collecting_sink_retains_records() {
        let sink = CollectingTraceSink::new();
        sink.record(TraceRecord {
            stage: TraceStage::Outcome,
            payload: json!({"granted": true}),
        });

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].stage, TraceStage::Outcome);
    }

    #[test]
    fn test_collecting_sink_take_drains() {
        let sink = CollectingTraceSink::new();
        sink.record(TraceRecord {
            stage: TraceStage::PolicyConsidered,
            payload: json!({}),
        });

        assert_eq!(sink.take().len(), 1);
        assert!(sink.records().is_empty());
    }

    #[test]
    fn test_stage_serialization() {
        assert_eq!(
            serde_json::to_value(TraceStage::ConditionEntered).unwrap(),
            json!("conditionEntered")
        );
    }
}
