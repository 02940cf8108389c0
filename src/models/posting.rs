//! Posting and notification payload structures.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

static PLACEHOLDER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\{(company|title|link)\}").ok());

/// A job listing candidate extracted from a page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Posting {
    /// Source name the posting was extracted for
    pub source: String,

    /// Visible title, possibly truncated
    pub title: String,

    /// Absolute URL of the posting (or of the listing page)
    pub link: String,
}

impl Posting {
    pub fn new(
        source: impl Into<String>,
        title: impl Into<String>,
        link: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            title: title.into(),
            link: link.into(),
        }
    }
}

/// A posting that has not been notified before.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewJob {
    /// Source (company) name
    pub company: String,

    pub title: String,

    pub link: String,
}

impl NewJob {
    /// Format the job using a template.
    ///
    /// Supported placeholders: `{company}`, `{title}`, `{link}`. Substituted
    /// text is never scanned for placeholders again.
    pub fn format(&self, template: &str) -> String {
        let Some(placeholder) = PLACEHOLDER.as_ref() else {
            return template.to_string();
        };
        placeholder
            .replace_all(template, |caps: &Captures<'_>| match &caps[1] {
                "company" => self.company.as_str(),
                "title" => self.title.as_str(),
                _ => self.link.as_str(),
            })
            .into_owned()
    }
}

impl From<Posting> for NewJob {
    fn from(posting: Posting) -> Self {
        Self {
            company: posting.source,
            title: posting.title,
            link: posting.link,
        }
    }
}
