//! Keyword filtering of shared mailbox content.
//!
//! The filter narrows what an allowed requester sees; it never takes part
//! in the allow/deny decision.

use crate::share::mailbox::Email;

/// Parsed form of a share's `keywordFilter` setting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordFilter {
    keywords: Vec<String>,
}

impl KeywordFilter {
    /// Comma-separated keywords, matched case-insensitively. Blank input
    /// yields a filter that matches everything.
    pub fn parse(raw: Option<&str>) -> Self {
        let keywords = raw
            .unwrap_or_default()
            .split(',')
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self { keywords }
    }

    pub fn is_unrestricted(&self) -> bool {
        self.keywords.is_empty()
    }

    pub fn matches(&self, email: &Email) -> bool {
        if self.is_unrestricted() {
            return true;
        }
        let haystacks = [
            email.subject.to_lowercase(),
            email.from.to_lowercase(),
            email.text.to_lowercase(),
        ];
        self.keywords
            .iter()
            .any(|k| haystacks.iter().any(|h| h.contains(k.as_str())))
    }

    /// Keep only matching emails, newest first.
    pub fn apply(&self, mut emails: Vec<Email>) -> FilteredEmails {
        let scanned = emails.len();
        emails.retain(|e| self.matches(e));
        emails.sort_by(|a, b| b.received_at.cmp(&a.received_at));
        FilteredEmails {
            scanned,
            emails,
            filtered: !self.is_unrestricted(),
        }
    }
}

/// Result of applying a [`KeywordFilter`].
#[derive(Debug, Clone)]
pub struct FilteredEmails {
    pub scanned: usize,
    pub emails: Vec<Email>,
    filtered: bool,
}

impl FilteredEmails {
    /// Short summary for the audit log.
    pub fn summary(&self) -> String {
        if self.filtered {
            format!("{} of {} emails matched keyword filter", self.emails.len(), self.scanned)
        } else {
            format!("{} emails", self.scanned)
        }
    }
}
