// controller.rs — Lifecycle controller for page-view instrumentation.
//
// PageViewInstrumentation is the single authority over enable/disable. It
// owns the content-loaded listener registration, asks the navigation source
// to wrap or restore the history primitives, and routes every occurrence
// through the enricher to the emission sink.
//
// State machine:
//   Disabled --enable()--> Enabled     (register listener, wrap history)
//   Enabled  --enable()--> Enabled     (re-register the listener, same load guard)
//   Enabled  --disable()-> Disabled    (drop listener, optionally restore history)
//   Disabled --disable()-> Disabled    (no-op)
//
// Callbacks installed in the host hold a `Weak` back-reference, so the
// host never keeps the controller alive and a dropped controller's hooks
// fall silent.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use pv_events::{EmissionSink, SinkProvider, StaticSinkProvider};

use crate::config::{Activation, InstrumentationConfig};
use crate::enricher;
use crate::error::InstrumentationError;
use crate::host::{ListenerId, NavigationHost};
use crate::source::{NavigationEventSource, NavigationOccurrence, OccurrenceHandler};

pub const INSTRUMENTATION_NAME: &str = "instrumentation-page-view";
pub const COMPONENT_NAME: &str = "page-view-event";

/// Identity an external registration layer can compose with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstrumentationInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub component: &'static str,
}

impl Default for InstrumentationInfo {
    fn default() -> Self {
        Self {
            name: INSTRUMENTATION_NAME,
            version: env!("CARGO_PKG_VERSION"),
            component: COMPONENT_NAME,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Disabled,
    Enabled,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleState::Disabled => write!(f, "disabled"),
            LifecycleState::Enabled => write!(f, "enabled"),
        }
    }
}

/// What an `enable()` or `disable()` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Disabled → Enabled.
    Enabled,
    /// Enabled → Enabled: the double-activation guard replaced the load
    /// listener instead of adding a second one.
    Reenabled,
    /// Enabled → Disabled.
    Disabled,
    /// Disabled → Disabled: nothing to do.
    AlreadyDisabled,
}

struct Inner {
    config: InstrumentationConfig,
    host: Rc<dyn NavigationHost>,
    source: NavigationEventSource,
    provider: Option<Rc<dyn SinkProvider>>,
    sink: RefCell<Option<Rc<dyn EmissionSink>>>,
    sink_unavailable: Cell<bool>,
    state: Cell<LifecycleState>,
    load_registration: Cell<Option<ListenerId>>,
    handler: OccurrenceHandler,
}

impl Inner {
    fn on_occurrence(&self, occurrence: NavigationOccurrence) {
        if self.state.get() != LifecycleState::Enabled {
            tracing::trace!(kind = ?occurrence.kind, "occurrence while disabled dropped");
            return;
        }

        let event = enricher::enrich(&occurrence, self.host.as_ref());
        // Clone out of the cell so a re-entrant sink cannot trip the borrow.
        let sink = self.sink.borrow().clone();
        match sink {
            Some(sink) => {
                let record = event.to_log_record().with_scope(&self.config.logger_name);
                tracing::trace!(
                    kind = ?occurrence.kind,
                    url = event.url(),
                    record_id = %record.record_id,
                    "page view emitted"
                );
                sink.emit(&record);
            }
            None => tracing::trace!(kind = ?occurrence.kind, "no emission sink, page view skipped"),
        }
    }

    fn resolve_sink(&self) {
        if self.sink.borrow().is_some() {
            return;
        }
        let resolved = self
            .provider
            .as_ref()
            .and_then(|provider| provider.sink(&self.config.logger_name));
        match resolved {
            Some(sink) => {
                *self.sink.borrow_mut() = Some(sink);
                self.sink_unavailable.set(false);
            }
            None => {
                // Reported once; later resolutions stay quiet.
                if !self.sink_unavailable.replace(true) {
                    let err = InstrumentationError::SinkUnavailable {
                        scope: self.config.logger_name.clone(),
                    };
                    if self.provider.is_some() {
                        tracing::warn!("{}", err);
                    } else {
                        tracing::debug!("{} (no sink provider configured)", err);
                    }
                }
            }
        }
    }
}

fn occurrence_handler(inner: Weak<Inner>) -> OccurrenceHandler {
    Rc::new(move |occurrence: NavigationOccurrence| {
        if let Some(inner) = inner.upgrade() {
            inner.on_occurrence(occurrence);
        }
    })
}

/// Detects page views on a host and emits them as log records.
///
/// ```rust
/// use std::rc::Rc;
/// use pv_events::MemorySink;
/// use pv_instrumentation::{PageViewInstrumentation, SimulatedHost};
///
/// let host = SimulatedHost::new("https://a/");
/// let sink = Rc::new(MemorySink::new());
/// let instrumentation = PageViewInstrumentation::builder(host.clone())
///     .sink(sink.clone())
///     .build()
///     .unwrap();
///
/// instrumentation.enable().unwrap();
/// host.fire_dom_content_loaded();
/// assert_eq!(sink.len(), 1);
/// ```
pub struct PageViewInstrumentation {
    inner: Rc<Inner>,
}

impl PageViewInstrumentation {
    pub fn builder(host: Rc<dyn NavigationHost>) -> PageViewInstrumentationBuilder {
        PageViewInstrumentationBuilder::new(host)
    }

    /// Disabled → Enabled, or re-register the load listener if already enabled.
    pub fn enable(&self) -> Result<Transition, InstrumentationError> {
        let inner = &self.inner;
        let reenabling = inner.state.get() == LifecycleState::Enabled;
        if reenabling {
            tracing::debug!("enable() while enabled; replacing load listener");
        } else {
            // A new enable cycle reports the current document again.
            inner.source.reset_load_guard();
        }

        inner.source.wrap_history(&inner.handler)?;

        // Hosts may accept duplicate listeners; keep exactly one registered.
        if let Some(id) = inner.load_registration.take() {
            inner.host.remove_load_listener(id);
        }
        let listener = inner.source.load_listener(&inner.handler);
        inner
            .load_registration
            .set(Some(inner.host.add_load_listener(listener)));

        inner.resolve_sink();
        inner.state.set(LifecycleState::Enabled);

        if reenabling {
            Ok(Transition::Reenabled)
        } else {
            tracing::debug!(name = INSTRUMENTATION_NAME, "page-view instrumentation enabled");
            Ok(Transition::Enabled)
        }
    }

    /// Enabled → Disabled. Calling it on a disabled instance does nothing.
    pub fn disable(&self) -> Transition {
        let inner = &self.inner;
        if inner.state.get() == LifecycleState::Disabled {
            tracing::trace!("disable() while disabled; nothing to do");
            return Transition::AlreadyDisabled;
        }

        if let Some(id) = inner.load_registration.take() {
            inner.host.remove_load_listener(id);
        }
        if inner.config.restore_history_on_disable {
            inner.source.unwrap_history();
        }
        inner.state.set(LifecycleState::Disabled);
        tracing::debug!(name = INSTRUMENTATION_NAME, "page-view instrumentation disabled");
        Transition::Disabled
    }

    pub fn info(&self) -> InstrumentationInfo {
        InstrumentationInfo::default()
    }

    pub fn state(&self) -> LifecycleState {
        self.inner.state.get()
    }

    pub fn is_enabled(&self) -> bool {
        self.state() == LifecycleState::Enabled
    }

    pub fn config(&self) -> &InstrumentationConfig {
        &self.inner.config
    }

    /// Whether the history primitives currently carry the interception layer.
    pub fn history_wrapped(&self) -> bool {
        self.inner.source.is_wrapped()
    }

    pub fn has_sink(&self) -> bool {
        self.inner.sink.borrow().is_some()
    }

    /// The sink-resolution failure, if the last attempt produced none.
    pub fn sink_error(&self) -> Option<InstrumentationError> {
        self.inner
            .sink_unavailable
            .get()
            .then(|| InstrumentationError::SinkUnavailable {
                scope: self.inner.config.logger_name.clone(),
            })
    }
}

impl Drop for PageViewInstrumentation {
    fn drop(&mut self) {
        self.disable();
        if self.inner.config.restore_history_on_disable {
            self.inner.source.unwrap_history();
        }
    }
}

/// Builds a [`PageViewInstrumentation`].
pub struct PageViewInstrumentationBuilder {
    host: Rc<dyn NavigationHost>,
    config: InstrumentationConfig,
    provider: Option<Rc<dyn SinkProvider>>,
}

impl PageViewInstrumentationBuilder {
    pub fn new(host: Rc<dyn NavigationHost>) -> Self {
        Self {
            host,
            config: InstrumentationConfig::default(),
            provider: None,
        }
    }

    pub fn config(mut self, config: InstrumentationConfig) -> Self {
        self.config = config;
        self
    }

    /// Obtain sinks from `provider`, keyed by the configured logger name.
    pub fn sink_provider(mut self, provider: Rc<dyn SinkProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Emit every record to one pre-built sink.
    pub fn sink(self, sink: Rc<dyn EmissionSink>) -> Self {
        self.sink_provider(Rc::new(StaticSinkProvider::new(sink)))
    }

    /// Check the host and construct the controller in the `Disabled` state.
    ///
    /// Fails with `PlatformUnsupported` if the host lacks history primitives.
    /// Eager activations configured as `on_construct` run here.
    pub fn build(self) -> Result<PageViewInstrumentation, InstrumentationError> {
        NavigationEventSource::check_platform(self.host.as_ref())?;

        let source = NavigationEventSource::new(Rc::clone(&self.host));
        let inner = Rc::new_cyclic(|weak: &Weak<Inner>| Inner {
            config: self.config,
            host: self.host,
            source,
            provider: self.provider,
            sink: RefCell::new(None),
            sink_unavailable: Cell::new(false),
            state: Cell::new(LifecycleState::Disabled),
            load_registration: Cell::new(None),
            handler: occurrence_handler(weak.clone()),
        });

        if inner.config.sink_resolution == Activation::OnConstruct {
            inner.resolve_sink();
        }
        if inner.config.history_activation == Activation::OnConstruct {
            inner.source.wrap_history(&inner.handler)?;
        }

        Ok(PageViewInstrumentation { inner })
    }
}
