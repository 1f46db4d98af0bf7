// sink.rs — Emission sinks and the providers that hand them out.
//
// The navigation layer only needs "accept one record". Everything behind
// that call (buffering, batching, retry, transport) belongs to the sink.
// Emission is fire-and-forget: `emit` has no return value, and a sink that
// can fail logs the failure itself.
//
// The whole pipeline runs on the host's single event-loop thread, so sinks
// are shared through `Rc` and use interior mutability where they buffer.

use std::cell::RefCell;
use std::rc::Rc;

use crate::record::LogRecord;

/// Accepts finished records for buffering and export.
pub trait EmissionSink {
    /// Hand one record to the sink. Never fails from the caller's view.
    fn emit(&self, record: &LogRecord);
}

/// Source of emission sinks, keyed by logger scope name.
///
/// Returning `None` means no sink could be obtained; callers keep working
/// and skip emission.
pub trait SinkProvider {
    fn sink(&self, scope: &str) -> Option<Rc<dyn EmissionSink>>;
}

/// Hands out the same pre-built sink for every scope.
pub struct StaticSinkProvider {
    sink: Rc<dyn EmissionSink>,
}

impl StaticSinkProvider {
    pub fn new(sink: Rc<dyn EmissionSink>) -> Self {
        Self { sink }
    }
}

impl SinkProvider for StaticSinkProvider {
    fn sink(&self, _scope: &str) -> Option<Rc<dyn EmissionSink>> {
        Some(Rc::clone(&self.sink))
    }
}

/// Buffers records in emission order.
#[derive(Default)]
pub struct MemorySink {
    records: RefCell<Vec<LogRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of everything emitted so far, oldest first.
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }

    /// Remove and return everything buffered.
    pub fn drain(&self) -> Vec<LogRecord> {
        std::mem::take(&mut *self.records.borrow_mut())
    }

    pub fn clear(&self) {
        self.records.borrow_mut().clear();
    }
}

impl EmissionSink for MemorySink {
    fn emit(&self, record: &LogRecord) {
        self.records.borrow_mut().push(record.clone());
    }
}

/// Writes each record as a structured `tracing` event (console exporter).
pub struct TracingSink;

impl TracingSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TracingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EmissionSink for TracingSink {
    fn emit(&self, record: &LogRecord) {
        match serde_json::to_string(record) {
            Ok(json) => tracing::info!(
                record_id = %record.record_id,
                scope = record.scope.as_deref().unwrap_or(""),
                "{}",
                json
            ),
            Err(e) => tracing::warn!("failed to encode record {}: {}", record.record_id, e),
        }
    }
}

/// Dispatches each record to multiple sinks, in registration order.
pub struct EventDispatcher {
    sinks: Vec<Rc<dyn EmissionSink>>,
}

impl EventDispatcher {
    /// Create a new dispatcher with no sinks.
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    /// Add an emission sink.
    pub fn add_sink(&mut self, sink: Rc<dyn EmissionSink>) {
        self.sinks.push(sink);
    }

    /// Add a sink and return self (builder pattern).
    pub fn with_sink(mut self, sink: Rc<dyn EmissionSink>) -> Self {
        self.add_sink(sink);
        self
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl EmissionSink for EventDispatcher {
    fn emit(&self, record: &LogRecord) {
        for sink in &self.sinks {
            sink.emit(record);
        }
    }
}
