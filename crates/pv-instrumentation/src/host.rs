// host.rs — The host platform surface the instrumentation runs against.
//
// A host is anything that exposes a document (url, referrer, title), a
// current location, a "document content loaded" notification, and the two
// history-mutating primitives. The primitives live in replaceable slots so
// the instrumentation can wrap them in place, the way page code sees a
// patched `history.pushState`.
//
// Hosts are single-threaded: every call happens on the event-loop thread,
// so the surface takes `&self` and implementations use interior mutability.

use std::fmt;
use std::rc::Rc;

use crate::error::HostError;

/// The two history-mutating primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HistoryMethod {
    PushState,
    ReplaceState,
}

impl HistoryMethod {
    pub const ALL: [HistoryMethod; 2] = [HistoryMethod::PushState, HistoryMethod::ReplaceState];

    /// Qualified name as page code would spell it.
    pub fn name(&self) -> &'static str {
        match self {
            HistoryMethod::PushState => "history.pushState",
            HistoryMethod::ReplaceState => "history.replaceState",
        }
    }
}

impl fmt::Display for HistoryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Arguments of a `pushState` / `replaceState` call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HistoryArgs {
    pub state: serde_json::Value,
    pub title: String,
    pub url: Option<String>,
}

impl HistoryArgs {
    pub fn new(state: serde_json::Value, title: impl Into<String>, url: Option<&str>) -> Self {
        Self {
            state,
            title: title.into(),
            url: url.map(str::to_string),
        }
    }
}

/// A history primitive as installed in the host.
pub type HistoryPrimitive = Rc<dyn Fn(&HistoryArgs) -> Result<(), HostError>>;

/// Callback run when the document's content has finished loading.
pub type LoadListener = Rc<dyn Fn()>;

/// Handle for a registered load listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Read-only view of the ambient document and location.
pub trait DocumentState {
    fn document_uri(&self) -> String;

    fn referrer(&self) -> String;

    fn title(&self) -> String;

    fn location_href(&self) -> String;

    /// Identifies the current document lifecycle; changes on every full load.
    ///
    /// Hosts that tear everything down on a full load can keep the default.
    fn load_generation(&self) -> u64 {
        0
    }
}

/// URL, referrer and title read together with no yield in between.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSnapshot {
    pub url: String,
    pub referrer: String,
    pub title: String,
}

impl DocumentSnapshot {
    pub fn capture<D: DocumentState + ?Sized>(doc: &D) -> Self {
        Self {
            url: doc.document_uri(),
            referrer: doc.referrer(),
            title: doc.title(),
        }
    }
}

/// The full host surface: document state plus the hookable primitives.
pub trait NavigationHost: DocumentState {
    /// The primitive currently installed for `method`, if the host has one.
    fn history_primitive(&self, method: HistoryMethod) -> Option<HistoryPrimitive>;

    /// Replace the primitive installed for `method`.
    fn set_history_primitive(&self, method: HistoryMethod, primitive: HistoryPrimitive);

    /// Register a listener for the document-content-loaded notification.
    fn add_load_listener(&self, listener: LoadListener) -> ListenerId;

    /// Remove a listener. Returns false if `id` was not registered.
    fn remove_load_listener(&self, id: ListenerId) -> bool;

    /// Call whatever primitive is installed for `method`, as page code would.
    fn invoke_history(&self, method: HistoryMethod, args: &HistoryArgs) -> Result<(), HostError> {
        let primitive =
            self.history_primitive(method)
                .ok_or_else(|| HostError::MissingPrimitive {
                    primitive: method.name().to_string(),
                })?;
        primitive(args)
    }
}
