//! # pv-events
//!
//! Page-view event model and the emission side of the telemetry pipeline.
//!
//! A navigation layer turns each page view into a [`PageViewEvent`], converts
//! it into a [`LogRecord`] (an attributes map keyed `event.domain`,
//! `event.name`, `event.type`, `event.data`), and hands that record to an
//! [`EmissionSink`]. Sinks own buffering and export; emission is
//! fire-and-forget.
//!
//! ## Quick Example
//!
//! ```rust
//! use pv_events::{EmissionSink, MemorySink, PageViewEvent};
//!
//! let sink = MemorySink::new();
//! let event = PageViewEvent::load("https://a/", "", "Home");
//! sink.emit(&event.to_log_record());
//! assert_eq!(sink.len(), 1);
//! ```

pub mod error;
pub mod event;
pub mod jsonl;
pub mod record;
pub mod sink;

pub use error::EventsError;
pub use event::{ChangeState, PageViewData, PageViewEvent, PageViewType, EVENT_DOMAIN, EVENT_NAME};
pub use jsonl::JsonlSink;
pub use record::LogRecord;
pub use sink::{
    EmissionSink, EventDispatcher, MemorySink, SinkProvider, StaticSinkProvider, TracingSink,
};
