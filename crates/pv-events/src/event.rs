// event.rs — Page-view event data model.
//
// A PageViewEvent is the enriched form of one navigation: either a real
// document load (type 0) or a virtual, history-driven navigation (type 1).
// The domain and name are constants; the type is derived from the data
// variant so the two can never disagree.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::{
    LogRecord, ATTR_EVENT_DATA, ATTR_EVENT_DOMAIN, ATTR_EVENT_NAME, ATTR_EVENT_TYPE,
};

/// Value of the `event.domain` attribute on every page-view record.
pub const EVENT_DOMAIN: &str = "browser";

/// Value of the `event.name` attribute on every page-view record.
pub const EVENT_NAME: &str = "page_view";

/// Which history primitive produced a virtual navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeState {
    PushState,
    ReplaceState,
}

impl ChangeState {
    /// The wire name: `"pushState"` or `"replaceState"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeState::PushState => "pushState",
            ChangeState::ReplaceState => "replaceState",
        }
    }
}

impl fmt::Display for ChangeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `event.type` discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageViewType {
    /// A full document load.
    Load,
    /// A history-driven (single-page-application) navigation.
    Virtual,
}

impl PageViewType {
    /// Numeric code carried in `event.type`: `0` for loads, `1` for virtual navigations.
    pub fn code(&self) -> u8 {
        match self {
            PageViewType::Load => 0,
            PageViewType::Virtual => 1,
        }
    }
}

/// The `event.data` payload.
///
/// Serialized untagged so the JSON carries only the documented keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PageViewData {
    Virtual {
        /// Location before the navigation was applied.
        #[serde(rename = "oldUrl")]
        old_url: String,
        /// Literal URL argument of the history call (empty when absent).
        url: String,
        title: String,
        /// Detection time in microseconds since the Unix epoch.
        #[serde(rename = "startTime")]
        start_time: i64,
        #[serde(rename = "changeState")]
        change_state: ChangeState,
    },
    Load {
        url: String,
        referrer: String,
        title: String,
    },
}

/// One enriched page view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageViewEvent {
    /// When the underlying navigation was detected.
    pub observed_at: DateTime<Utc>,
    pub data: PageViewData,
}

impl PageViewEvent {
    /// A real document load.
    pub fn load(
        url: impl Into<String>,
        referrer: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            observed_at: Utc::now(),
            data: PageViewData::Load {
                url: url.into(),
                referrer: referrer.into(),
                title: title.into(),
            },
        }
    }

    /// A virtual navigation through `pushState` or `replaceState`.
    pub fn virtual_navigation(
        old_url: impl Into<String>,
        url: impl Into<String>,
        title: impl Into<String>,
        start_time: i64,
        change_state: ChangeState,
    ) -> Self {
        Self {
            observed_at: Utc::now(),
            data: PageViewData::Virtual {
                old_url: old_url.into(),
                url: url.into(),
                title: title.into(),
                start_time,
                change_state,
            },
        }
    }

    /// Override the detection timestamp (builder pattern).
    pub fn observed_at(mut self, at: DateTime<Utc>) -> Self {
        self.observed_at = at;
        self
    }

    pub fn domain(&self) -> &'static str {
        EVENT_DOMAIN
    }

    pub fn name(&self) -> &'static str {
        EVENT_NAME
    }

    pub fn event_type(&self) -> PageViewType {
        match self.data {
            PageViewData::Load { .. } => PageViewType::Load,
            PageViewData::Virtual { .. } => PageViewType::Virtual,
        }
    }

    /// The URL this page view landed on.
    pub fn url(&self) -> &str {
        match &self.data {
            PageViewData::Load { url, .. } | PageViewData::Virtual { url, .. } => url,
        }
    }

    /// Build the record handed to an emission sink.
    pub fn to_log_record(&self) -> LogRecord {
        // Plain strings and integers always convert; Null is unreachable in practice.
        let data = serde_json::to_value(&self.data).unwrap_or_default();
        LogRecord::at(self.observed_at)
            .with_attribute(ATTR_EVENT_DOMAIN, EVENT_DOMAIN)
            .with_attribute(ATTR_EVENT_NAME, EVENT_NAME)
            .with_attribute(ATTR_EVENT_TYPE, self.event_type().code())
            .with_attribute(ATTR_EVENT_DATA, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn load_record_matches_documented_shape() {
        let record = PageViewEvent::load("https://a/", "", "Home").to_log_record();

        assert_eq!(record.attribute(ATTR_EVENT_DOMAIN), Some(&json!("browser")));
        assert_eq!(record.attribute(ATTR_EVENT_NAME), Some(&json!("page_view")));
        assert_eq!(record.attribute(ATTR_EVENT_TYPE), Some(&json!(0)));
        assert_eq!(
            record.attribute(ATTR_EVENT_DATA),
            Some(&json!({"url": "https://a/", "referrer": "", "title": "Home"}))
        );
    }

    #[test]
    fn virtual_record_uses_camel_case_keys() {
        let event = PageViewEvent::virtual_navigation(
            "https://a/",
            "/b",
            "Home",
            1_700_000_000_000_000,
            ChangeState::PushState,
        );
        let record = event.to_log_record();

        assert_eq!(record.attribute(ATTR_EVENT_TYPE), Some(&json!(1)));
        assert_eq!(
            record.attribute(ATTR_EVENT_DATA),
            Some(&json!({
                "oldUrl": "https://a/",
                "url": "/b",
                "title": "Home",
                "startTime": 1_700_000_000_000_000i64,
                "changeState": "pushState",
            }))
        );
    }

    #[test]
    fn event_type_follows_data_variant() {
        assert_eq!(PageViewEvent::load("u", "r", "t").event_type(), PageViewType::Load);
        let virt =
            PageViewEvent::virtual_navigation("a", "b", "t", 0, ChangeState::ReplaceState);
        assert_eq!(virt.event_type(), PageViewType::Virtual);
        assert_eq!(virt.event_type().code(), 1);
        assert_eq!(virt.url(), "b");
    }

    #[test]
    fn data_deserializes_into_matching_variant() {
        let load: PageViewData =
            serde_json::from_value(json!({"url": "u", "referrer": "r", "title": "t"})).unwrap();
        assert!(matches!(load, PageViewData::Load { .. }));

        let virt: PageViewData = serde_json::from_value(json!({
            "oldUrl": "a", "url": "b", "title": "t", "startTime": 5, "changeState": "replaceState"
        }))
        .unwrap();
        assert!(matches!(
            virt,
            PageViewData::Virtual {
                change_state: ChangeState::ReplaceState,
                ..
            }
        ));
    }

    #[test]
    fn change_state_display() {
        assert_eq!(ChangeState::PushState.to_string(), "pushState");
        assert_eq!(ChangeState::ReplaceState.to_string(), "replaceState");
    }
}
