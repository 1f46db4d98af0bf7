// simulated.rs — In-memory host for tests and headless embedding.
//
// SimulatedHost behaves like a browser document for the parts the
// instrumentation touches: it resolves history URLs against the current
// location with WHATWG URL rules, refuses cross-origin history changes, keeps session history
// entries, and dispatches the content-loaded notification to listeners.
// Full document loads are driven explicitly with `load_document` followed
// by `fire_dom_content_loaded`.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use url::{Origin, Url};

use crate::error::HostError;
use crate::host::{
    DocumentState, HistoryArgs, HistoryMethod, HistoryPrimitive, ListenerId, LoadListener,
    NavigationHost,
};

/// One session history entry.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub url: String,
    pub state: serde_json::Value,
    pub title: String,
}

struct Document {
    uri: String,
    referrer: String,
    title: String,
    location: String,
    generation: u64,
    entries: Vec<HistoryEntry>,
    index: usize,
}

pub struct SimulatedHost {
    document: RefCell<Document>,
    push_state: RefCell<Option<HistoryPrimitive>>,
    replace_state: RefCell<Option<HistoryPrimitive>>,
    listeners: RefCell<Vec<(ListenerId, LoadListener)>>,
    next_listener_id: Cell<u64>,
}

impl SimulatedHost {
    /// A host showing `url`, with native history primitives installed.
    pub fn new(url: &str) -> Rc<Self> {
        Rc::new_cyclic(|weak: &Weak<SimulatedHost>| {
            let host = Self::bare(url);
            *host.push_state.borrow_mut() =
                Some(native_primitive(weak.clone(), HistoryMethod::PushState));
            *host.replace_state.borrow_mut() =
                Some(native_primitive(weak.clone(), HistoryMethod::ReplaceState));
            host
        })
    }

    /// A host with no history primitives at all.
    pub fn without_history(url: &str) -> Rc<Self> {
        Rc::new(Self::bare(url))
    }

    fn bare(url: &str) -> Self {
        Self {
            document: RefCell::new(Document {
                uri: url.to_string(),
                referrer: String::new(),
                title: String::new(),
                location: url.to_string(),
                generation: 1,
                entries: vec![HistoryEntry {
                    url: url.to_string(),
                    state: serde_json::Value::Null,
                    title: String::new(),
                }],
                index: 0,
            }),
            push_state: RefCell::new(None),
            replace_state: RefCell::new(None),
            listeners: RefCell::new(Vec::new()),
            next_listener_id: Cell::new(1),
        }
    }

    /// Start a new document: a full load of `url` reached from `referrer`.
    ///
    /// Listeners stay registered; call `fire_dom_content_loaded` once the
    /// new document is ready.
    pub fn load_document(&self, url: &str, referrer: &str, title: &str) {
        let mut doc = self.document.borrow_mut();
        doc.uri = url.to_string();
        doc.location = url.to_string();
        doc.referrer = referrer.to_string();
        doc.title = title.to_string();
        doc.generation += 1;
        let keep = doc.index + 1;
        doc.entries.truncate(keep);
        doc.entries.push(HistoryEntry {
            url: url.to_string(),
            state: serde_json::Value::Null,
            title: title.to_string(),
        });
        doc.index = doc.entries.len() - 1;
    }

    /// Dispatch the content-loaded notification. Returns how many listeners ran.
    pub fn fire_dom_content_loaded(&self) -> usize {
        // Snapshot first: listeners may add or remove registrations.
        let listeners: Vec<LoadListener> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for listener in &listeners {
            listener();
        }
        listeners.len()
    }

    pub fn set_title(&self, title: &str) {
        self.document.borrow_mut().title = title.to_string();
    }

    pub fn set_referrer(&self, referrer: &str) {
        self.document.borrow_mut().referrer = referrer.to_string();
    }

    /// Page-code style `history.pushState(state, title, url)`.
    pub fn push_state(
        &self,
        state: serde_json::Value,
        title: &str,
        url: Option<&str>,
    ) -> Result<(), HostError> {
        self.invoke_history(HistoryMethod::PushState, &HistoryArgs::new(state, title, url))
    }

    /// Page-code style `history.replaceState(state, title, url)`.
    pub fn replace_state(
        &self,
        state: serde_json::Value,
        title: &str,
        url: Option<&str>,
    ) -> Result<(), HostError> {
        self.invoke_history(HistoryMethod::ReplaceState, &HistoryArgs::new(state, title, url))
    }

    pub fn history_len(&self) -> usize {
        self.document.borrow().entries.len()
    }

    pub fn current_entry(&self) -> HistoryEntry {
        let doc = self.document.borrow();
        doc.entries[doc.index].clone()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// ASCII serialization of the current location's origin.
    pub fn origin(&self) -> String {
        Url::parse(&self.document.borrow().location)
            .map(|url| url.origin().ascii_serialization())
            .unwrap_or_else(|_| Origin::new_opaque().ascii_serialization())
    }

    fn apply_history(&self, method: HistoryMethod, args: &HistoryArgs) -> Result<(), HostError> {
        let mut doc = self.document.borrow_mut();
        let base = parse(&doc.location, None)?;
        let target = match &args.url {
            Some(url) => parse(url, Some(&base))?,
            None => base.clone(),
        };

        if target.origin() != base.origin() {
            return Err(HostError::SecurityError {
                url: target.into(),
                origin: base.origin().ascii_serialization(),
            });
        }
        let target: String = target.into();

        let entry = HistoryEntry {
            url: target.clone(),
            state: args.state.clone(),
            title: args.title.clone(),
        };
        match method {
            HistoryMethod::PushState => {
                let keep = doc.index + 1;
                doc.entries.truncate(keep);
                doc.entries.push(entry);
                doc.index = doc.entries.len() - 1;
            }
            HistoryMethod::ReplaceState => {
                let index = doc.index;
                doc.entries[index] = entry;
            }
        }
        doc.uri = target.clone();
        doc.location = target;
        Ok(())
    }

    fn slot(&self, method: HistoryMethod) -> &RefCell<Option<HistoryPrimitive>> {
        match method {
            HistoryMethod::PushState => &self.push_state,
            HistoryMethod::ReplaceState => &self.replace_state,
        }
    }
}

fn native_primitive(host: Weak<SimulatedHost>, method: HistoryMethod) -> HistoryPrimitive {
    Rc::new(move |args: &HistoryArgs| match host.upgrade() {
        Some(host) => host.apply_history(method, args),
        None => Ok(()),
    })
}

impl DocumentState for SimulatedHost {
    fn document_uri(&self) -> String {
        self.document.borrow().uri.clone()
    }

    fn referrer(&self) -> String {
        self.document.borrow().referrer.clone()
    }

    fn title(&self) -> String {
        self.document.borrow().title.clone()
    }

    fn location_href(&self) -> String {
        self.document.borrow().location.clone()
    }

    fn load_generation(&self) -> u64 {
        self.document.borrow().generation
    }
}

impl NavigationHost for SimulatedHost {
    fn history_primitive(&self, method: HistoryMethod) -> Option<HistoryPrimitive> {
        self.slot(method).borrow().clone()
    }

    fn set_history_primitive(&self, method: HistoryMethod, primitive: HistoryPrimitive) {
        *self.slot(method).borrow_mut() = Some(primitive);
    }

    fn add_load_listener(&self, listener: LoadListener) -> ListenerId {
        let id = ListenerId(self.next_listener_id.get());
        self.next_listener_id.set(id.0 + 1);
        self.listeners.borrow_mut().push((id, listener));
        id
    }

    fn remove_load_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(registered, _)| *registered != id);
        listeners.len() != before
    }
}

/// Parse `input`, resolving it against `base` the way a history call would.
fn parse(input: &str, base: Option<&Url>) -> Result<Url, HostError> {
    Url::options()
        .base_url(base)
        .parse(input)
        .map_err(|_| HostError::InvalidUrl {
            url: input.to_string(),
            base: base.map(|url| url.to_string()).unwrap_or_default(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn resolve(base: &str, target: &str) -> String {
        let base = parse(base, None).unwrap();
        parse(target, Some(&base)).unwrap().into()
    }

    #[test]
    fn resolves_relative_references() {
        let base = "https://a.test/docs/page?x=1#top";
        assert_eq!(resolve(base, "/b"), "https://a.test/b");
        assert_eq!(resolve(base, "other"), "https://a.test/docs/other");
        assert_eq!(resolve(base, "../up"), "https://a.test/up");
        assert_eq!(resolve(base, "./same"), "https://a.test/docs/same");
        assert_eq!(resolve(base, "?y=2"), "https://a.test/docs/page?y=2");
        assert_eq!(resolve(base, "#end"), "https://a.test/docs/page?x=1#end");
        assert_eq!(resolve(base, ""), "https://a.test/docs/page?x=1");
        assert_eq!(resolve(base, "//a.test/c"), "https://a.test/c");
        assert_eq!(resolve(base, "https://a.test/d"), "https://a.test/d");
        assert_eq!(resolve("https://a.test", "x"), "https://a.test/x");
    }

    #[test]
    fn origin_ignores_userinfo_and_default_port() {
        let host = SimulatedHost::new("https://a.test/x");
        assert_eq!(host.origin(), "https://a.test");

        host.push_state(json!({}), "", Some("https://user@a.test:443/y"))
            .unwrap();
        assert_eq!(host.location_href(), "https://user@a.test/y");

        let err = host
            .push_state(json!({}), "", Some("https://a.test:8443/z"))
            .unwrap_err();
        assert!(matches!(err, HostError::SecurityError { .. }));
    }

    #[test]
    fn unparseable_url_is_refused() {
        let host = SimulatedHost::new("https://a.test/");
        let err = host
            .push_state(json!({}), "", Some("https://[not-a-host/"))
            .unwrap_err();

        assert!(matches!(err, HostError::InvalidUrl { .. }));
        assert_eq!(host.history_len(), 1);
    }

    #[test]
    fn push_state_appends_entry_and_moves_location() {
        let host = SimulatedHost::new("https://a/");
        host.push_state(json!({"page": 2}), "", Some("/b")).unwrap();

        assert_eq!(host.location_href(), "https://a/b");
        assert_eq!(host.document_uri(), "https://a/b");
        assert_eq!(host.history_len(), 2);
        assert_eq!(host.current_entry().state, json!({"page": 2}));
    }

    #[test]
    fn replace_state_overwrites_current_entry() {
        let host = SimulatedHost::new("https://a/");
        host.replace_state(json!(null), "t", Some("/c")).unwrap();

        assert_eq!(host.history_len(), 1);
        assert_eq!(host.current_entry().url, "https://a/c");
        assert_eq!(host.current_entry().title, "t");
    }

    #[test]
    fn absent_url_keeps_location() {
        let host = SimulatedHost::new("https://a/x");
        host.push_state(json!({"k": 1}), "", None).unwrap();

        assert_eq!(host.location_href(), "https://a/x");
        assert_eq!(host.history_len(), 2);
    }

    #[test]
    fn cross_origin_history_change_is_refused() {
        let host = SimulatedHost::new("https://a/");
        let err = host
            .push_state(json!({}), "", Some("https://evil.test/"))
            .unwrap_err();

        assert!(matches!(err, HostError::SecurityError { .. }));
        assert_eq!(host.location_href(), "https://a/");
        assert_eq!(host.history_len(), 1);
    }

    #[test]
    fn load_listeners_register_fire_and_unregister() {
        let host = SimulatedHost::new("https://a/");
        let hits = Rc::new(Cell::new(0));
        let counter = hits.clone();
        let id = host.add_load_listener(Rc::new(move || counter.set(counter.get() + 1)));

        assert_eq!(host.fire_dom_content_loaded(), 1);
        assert!(host.remove_load_listener(id));
        assert!(!host.remove_load_listener(id));
        assert_eq!(host.fire_dom_content_loaded(), 0);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn load_document_starts_new_generation() {
        let host = SimulatedHost::new("https://a/");
        let first = host.load_generation();
        host.load_document("https://a/next", "https://a/", "Next");

        assert_ne!(host.load_generation(), first);
        assert_eq!(host.referrer(), "https://a/");
        assert_eq!(host.title(), "Next");
    }

    #[test]
    fn host_without_history_has_no_primitives() {
        let host = SimulatedHost::without_history("https://a/");
        for method in HistoryMethod::ALL {
            assert!(host.history_primitive(method).is_none());
        }
        assert!(matches!(
            host.push_state(json!({}), "", Some("/b")),
            Err(HostError::MissingPrimitive { .. })
        ));
    }
}
