// source.rs — Navigation detection.
//
// NavigationEventSource turns the two kinds of navigation into raw
// occurrences:
//   - a content-loaded listener raises `Load` once per document lifecycle
//   - wrapped history primitives raise `PushState` / `ReplaceState` right
//     after the original primitive has run to completion
//
// Wrapping is process-wide mutable state on the host. The originals are
// saved exactly once; while they are saved, further wrap requests are
// no-ops, so there is never more than one interception layer.
//
// Restoring only swaps a slot back when our layer is still the installed
// primitive. If page code wrapped on top of us, the slot is left alone and
// our layer is disarmed instead: it keeps forwarding to the original but
// raises nothing.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use chrono::{DateTime, Utc};
use pv_events::ChangeState;

use crate::error::{HostError, InstrumentationError};
use crate::host::{
    DocumentState, HistoryArgs, HistoryMethod, HistoryPrimitive, LoadListener, NavigationHost,
};

/// How a navigation was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum OccurrenceKind {
    Load,
    PushState,
    ReplaceState,
}

impl OccurrenceKind {
    /// The history change behind a virtual occurrence; `None` for loads.
    pub fn change_state(&self) -> Option<ChangeState> {
        match self {
            OccurrenceKind::Load => None,
            OccurrenceKind::PushState => Some(ChangeState::PushState),
            OccurrenceKind::ReplaceState => Some(ChangeState::ReplaceState),
        }
    }
}

impl From<HistoryMethod> for OccurrenceKind {
    fn from(method: HistoryMethod) -> Self {
        match method {
            HistoryMethod::PushState => OccurrenceKind::PushState,
            HistoryMethod::ReplaceState => OccurrenceKind::ReplaceState,
        }
    }
}

/// A raw navigation signal, before enrichment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NavigationOccurrence {
    pub kind: OccurrenceKind,

    /// URL argument of the triggering history call. Always `None` for loads.
    pub target_url: Option<String>,

    /// Location read just before the original primitive ran.
    pub previous_url: Option<String>,

    pub observed_at: DateTime<Utc>,
}

impl NavigationOccurrence {
    pub fn load() -> Self {
        Self {
            kind: OccurrenceKind::Load,
            target_url: None,
            previous_url: None,
            observed_at: Utc::now(),
        }
    }

    pub fn history(
        method: HistoryMethod,
        target_url: Option<String>,
        previous_url: Option<String>,
    ) -> Self {
        Self {
            kind: method.into(),
            target_url,
            previous_url,
            observed_at: Utc::now(),
        }
    }
}

/// Receives every occurrence the source raises.
pub(crate) type OccurrenceHandler = Rc<dyn Fn(NavigationOccurrence)>;

struct Layer {
    original: HistoryPrimitive,
    wrapper: HistoryPrimitive,
}

struct SavedPrimitives {
    push_state: Layer,
    replace_state: Layer,
    armed: Rc<Cell<bool>>,
}

pub(crate) struct NavigationEventSource {
    host: Rc<dyn NavigationHost>,
    saved: RefCell<Option<SavedPrimitives>>,
    /// Load generation the content-loaded listeners last fired for. Shared
    /// by every listener this source builds, so re-registering one does not
    /// forget which document was already reported.
    load_fired_for: Rc<Cell<Option<u64>>>,
}

impl NavigationEventSource {
    pub fn new(host: Rc<dyn NavigationHost>) -> Self {
        Self {
            host,
            saved: RefCell::new(None),
            load_fired_for: Rc::new(Cell::new(None)),
        }
    }

    /// Fail with `PlatformUnsupported` unless both history primitives exist.
    pub fn check_platform(host: &dyn NavigationHost) -> Result<(), InstrumentationError> {
        let missing: Vec<&str> = HistoryMethod::ALL
            .iter()
            .filter(|method| host.history_primitive(**method).is_none())
            .map(|method| method.name())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(InstrumentationError::PlatformUnsupported {
                missing: missing.join(", "),
            })
        }
    }

    pub fn is_wrapped(&self) -> bool {
        self.saved.borrow().is_some()
    }

    /// Install the interception layer on both history primitives.
    ///
    /// Returns `Ok(false)` when the layer is already installed.
    pub fn wrap_history(&self, handler: &OccurrenceHandler) -> Result<bool, InstrumentationError> {
        if self.is_wrapped() {
            tracing::trace!("history primitives already wrapped");
            return Ok(false);
        }
        let armed = Rc::new(Cell::new(true));
        let push_state = self.install(HistoryMethod::PushState, handler, &armed)?;
        let replace_state = self.install(HistoryMethod::ReplaceState, handler, &armed)?;
        *self.saved.borrow_mut() = Some(SavedPrimitives {
            push_state,
            replace_state,
            armed,
        });
        tracing::debug!("wrapped history.pushState and history.replaceState");
        Ok(true)
    }

    fn install(
        &self,
        method: HistoryMethod,
        handler: &OccurrenceHandler,
        armed: &Rc<Cell<bool>>,
    ) -> Result<Layer, InstrumentationError> {
        let original = self.original(method)?;
        let wrapper = intercept(
            method,
            Rc::clone(&original),
            Rc::downgrade(&self.host),
            Rc::clone(handler),
            Rc::clone(armed),
        );
        self.host.set_history_primitive(method, Rc::clone(&wrapper));
        Ok(Layer { original, wrapper })
    }

    fn original(&self, method: HistoryMethod) -> Result<HistoryPrimitive, InstrumentationError> {
        self.host
            .history_primitive(method)
            .ok_or_else(|| InstrumentationError::PlatformUnsupported {
                missing: method.name().to_string(),
            })
    }

    /// Take our interception layer out of service. Returns false if nothing
    /// was wrapped.
    ///
    /// A slot still holding our wrapper gets its original back. A slot that
    /// another layer has since wrapped is left as it is; our layer stays in
    /// that chain disarmed.
    pub fn unwrap_history(&self) -> bool {
        let Some(saved) = self.saved.borrow_mut().take() else {
            return false;
        };
        saved.armed.set(false);
        for (method, layer) in [
            (HistoryMethod::PushState, saved.push_state),
            (HistoryMethod::ReplaceState, saved.replace_state),
        ] {
            let ours = self
                .host
                .history_primitive(method)
                .is_some_and(|current| Rc::ptr_eq(&current, &layer.wrapper));
            if ours {
                self.host.set_history_primitive(method, layer.original);
                tracing::debug!(%method, "restored original history primitive");
            } else {
                tracing::debug!(%method, "history primitive wrapped again since; leaving it installed");
            }
        }
        true
    }

    /// Forget which document the load listeners already reported, so the
    /// next readiness signal raises a `Load` again.
    pub fn reset_load_guard(&self) {
        self.load_fired_for.set(None);
    }

    /// Build a content-loaded listener that raises one `Load` per document.
    ///
    /// Listeners remember the load generation they last fired for, so a
    /// repeated readiness signal for the same document is ignored, even
    /// across listener re-registration.
    pub fn load_listener(&self, handler: &OccurrenceHandler) -> LoadListener {
        let host = Rc::downgrade(&self.host);
        let handler = Rc::clone(handler);
        let fired_for = Rc::clone(&self.load_fired_for);
        Rc::new(move || {
            let Some(host) = host.upgrade() else {
                return;
            };
            let generation = host.load_generation();
            if fired_for.get() == Some(generation) {
                tracing::trace!(generation, "repeated content-loaded signal ignored");
                return;
            }
            fired_for.set(Some(generation));
            handler(NavigationOccurrence::load());
        })
    }
}

fn intercept(
    method: HistoryMethod,
    original: HistoryPrimitive,
    host: Weak<dyn NavigationHost>,
    handler: OccurrenceHandler,
    armed: Rc<Cell<bool>>,
) -> HistoryPrimitive {
    Rc::new(move |args: &HistoryArgs| -> Result<(), HostError> {
        if !armed.get() {
            return original(args);
        }
        let previous_url = host.upgrade().map(|host| host.location_href());
        original(args)?;
        handler(NavigationOccurrence::history(
            method,
            args.url.clone(),
            previous_url,
        ));
        Ok(())
    })
}
