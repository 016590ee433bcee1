//! Article identity.
//!
//! An `ArticleKey` is `RFC3339(effective timestamp) + "-" + title`, where
//! the effective timestamp is the updated time if present, else the
//! published time. Timestamps are rendered in UTC with second precision
//! and a `Z` suffix, so comparing keys as strings orders them
//! chronologically with ties broken by title.
//!
//! Keys carry no feed identity: the same title at the same instant is the
//! same article whichever feed it came from.

use std::fmt;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// `0000-01-01T00:00:00Z`, the earliest instant RFC 3339 can express.
const YEAR_ZERO_SECS: i64 = -62_167_219_200;

/// Totally ordered identifier of a feed item.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArticleKey(String);

impl ArticleKey {
    /// Derive the key of an item.
    ///
    /// Returns `None` when the item has neither timestamp.
    pub fn derive(
        title: &str,
        published: Option<DateTime<Utc>>,
        updated: Option<DateTime<Utc>>,
    ) -> Option<Self> {
        updated.or(published).map(|ts| Self::at(ts, title))
    }

    /// Key for `title` at instant `ts`.
    pub fn at(ts: DateTime<Utc>, title: &str) -> Self {
        ArticleKey(format!(
            "{}-{}",
            ts.to_rfc3339_opts(SecondsFormat::Secs, true),
            title
        ))
    }

    /// Staleness floor: the key of an empty title at `now - window`.
    ///
    /// Any item stamped at or before that instant sorts at or below it.
    /// A window reaching back before year 0 saturates there.
    pub fn cutoff(now: DateTime<Utc>, window: Duration) -> Self {
        let floor = DateTime::from_timestamp(YEAR_ZERO_SECS, 0).unwrap_or(DateTime::UNIX_EPOCH);
        let at = now.checked_sub_signed(window).map_or(floor, |t| t.max(floor));
        Self::at(at, "")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArticleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ArticleKey {
    fn from(raw: String) -> Self {
        ArticleKey(raw)
    }
}
