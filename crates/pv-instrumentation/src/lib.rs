//! # pv-instrumentation
//!
//! Navigation interception and page-view event normalization.
//!
//! The crate watches a host document for full loads and for history-driven
//! ("virtual") navigations, turns each into exactly one page-view record, and
//! hands it to an emission sink from `pv-events`.
//!
//! ## Key components
//!
//! - [`NavigationHost`] / [`DocumentState`] — the host platform surface
//! - [`PageViewInstrumentation`] — the enable/disable lifecycle controller
//! - [`InstrumentationConfig`] — logger name and activation choices
//! - [`SimulatedHost`] — an in-memory host for tests and headless use
//!
//! Detection (wrapping the history primitives and the content-loaded
//! listener) and enrichment are internal: only the controller installs or
//! removes hooks on a host. [`HistoryPrimitive`] and [`LoadListener`] are
//! public because host implementations store them.
//!
//! The pipeline is single-threaded and synchronous: an occurrence is
//! detected, enriched and emitted within the host call that caused it.

pub mod config;
pub mod controller;
mod enricher;
pub mod error;
pub mod host;
pub mod simulated;
mod source;

pub use config::{Activation, InstrumentationConfig};
pub use controller::{
    InstrumentationInfo, LifecycleState, PageViewInstrumentation, PageViewInstrumentationBuilder,
    Transition,
};
pub use error::{HostError, InstrumentationError};
pub use host::{
    DocumentSnapshot, DocumentState, HistoryArgs, HistoryMethod, HistoryPrimitive, ListenerId,
    LoadListener, NavigationHost,
};
pub use simulated::{HistoryEntry, SimulatedHost};
