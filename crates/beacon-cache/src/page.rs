//! Current page tracking.

use beacon_types::{keys, Attributes, PageView};
use serde_json::Value;

/// Tracks the page the user is currently on.
///
/// The current page's attributes enrich the metadata of every event recorded
/// while it is current.
#[derive(Debug, Default)]
pub struct PageManager {
    current: Option<PageView>,
}

impl PageManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of the current page, or the empty string before any page view.
    pub fn page_id(&self) -> &str {
        self.current.as_ref().map_or("", |page| page.page_id.as_str())
    }

    /// Whether `page_id` is already the current page.
    pub fn is_current(&self, page_id: &str) -> bool {
        self.current
            .as_ref()
            .is_some_and(|page| page.page_id == page_id)
    }

    pub fn set(&mut self, page: PageView) {
        self.current = Some(page);
    }

    /// Metadata contributed by the current page: custom page attributes
    /// first, then title, page id and tags.
    pub fn attributes(&self) -> Attributes {
        let mut attributes = Attributes::new();
        let Some(page) = &self.current else {
            return attributes;
        };

        for (key, value) in &page.page_attributes {
            attributes.insert(key.clone(), value.clone());
        }
        attributes.insert(
            keys::TITLE.into(),
            Value::String(page.title.clone().unwrap_or_default()),
        );
        attributes.insert(keys::PAGE_ID.into(), Value::String(page.page_id.clone()));
        if !page.page_tags.is_empty() {
            attributes.insert(
                keys::PAGE_TAGS.into(),
                Value::Array(page.page_tags.iter().cloned().map(Value::String).collect()),
            );
        }
        attributes
    }
}
