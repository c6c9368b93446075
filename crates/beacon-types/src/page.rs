//! Page view descriptor.

use serde::{Deserialize, Serialize};

use crate::event::Attributes;

/// A page view as supplied by the host application.
///
/// A bare page id converts into a view with no tags, attributes or title.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageView {
    pub page_id: String,
    pub page_tags: Vec<String>,
    pub page_attributes: Attributes,
    pub title: Option<String>,
}

impl PageView {
    pub fn new(page_id: impl Into<String>) -> Self {
        Self {
            page_id: page_id.into(),
            ..Self::default()
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.page_tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.page_attributes = attributes;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

impl From<&str> for PageView {
    fn from(page_id: &str) -> Self {
        Self::new(page_id)
    }
}

impl From<String> for PageView {
    fn from(page_id: String) -> Self {
        Self::new(page_id)
    }
}
