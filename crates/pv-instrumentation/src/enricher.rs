// enricher.rs — Occurrence + ambient document state → PageViewEvent.
//
// Enrichment is read-only: it only sees the host through `DocumentState`.
// It never fails; anything missing becomes an empty string.

use pv_events::PageViewEvent;

use crate::host::{DocumentSnapshot, DocumentState};
use crate::source::NavigationOccurrence;

/// Build the page-view event for one occurrence.
///
/// Loads read url, referrer and title as one snapshot. Virtual navigations
/// take `oldUrl` first (from the occurrence when the wrapper captured it,
/// otherwise from the live location), then use the literal URL argument of
/// the history call rather than re-reading location.
pub(crate) fn enrich<D: DocumentState + ?Sized>(occurrence: &NavigationOccurrence, doc: &D) -> PageViewEvent {
    let event = match occurrence.kind.change_state() {
        None => {
            let snapshot = DocumentSnapshot::capture(doc);
            PageViewEvent::load(snapshot.url, snapshot.referrer, snapshot.title)
        }
        Some(change_state) => {
            let old_url = match &occurrence.previous_url {
                Some(url) => url.clone(),
                None => doc.location_href(),
            };
            let start_time = occurrence.observed_at.timestamp_micros();
            let url = occurrence.target_url.clone().unwrap_or_default();
            PageViewEvent::virtual_navigation(old_url, url, doc.title(), start_time, change_state)
        }
    };
    event.observed_at(occurrence.observed_at)
}
