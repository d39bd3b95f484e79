//! Document ordering.
//!
//! [`sort_documents`] ranks a collection by one of three keys and returns a
//! new vector, leaving the input untouched. The per-key comparators are
//! direction-neutral; the requested [`SortOrder`] is applied once, uniformly,
//! on top of them.
//!
//! # Creation date ordering
//!
//! [`compare_created_dates`] ranks the newer document first. This is the
//! catalog's long-standing behavior: "ascending by date" lists the most
//! recent documents at the top, and `Desc` lists the oldest first.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::models::Document;
use crate::version::compare_versions;

/// The field a document list is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortBy {
    #[default]
    Name,
    Version,
    CreatedDate,
}

/// Direction applied on top of the key comparator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn toggled(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }
}

impl FromStr for SortBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" | "title" => Ok(SortBy::Name),
            "version" => Ok(SortBy::Version),
            "createdDate" | "created" | "date" => Ok(SortBy::CreatedDate),
            other => Err(format!(
                "unknown sort key '{}': expected name, version, or createdDate",
                other
            )),
        }
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SortBy::Name => "name",
            SortBy::Version => "version",
            SortBy::CreatedDate => "createdDate",
        };
        f.write_str(s)
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        })
    }
}

/// Return a sorted copy of `documents`.
///
/// The sort is stable: documents that compare equal keep their input order.
pub fn sort_documents(documents: &[Document], by: SortBy, order: SortOrder) -> Vec<Document> {
    let mut sorted = documents.to_vec();
    sorted.sort_by(|a, b| {
        let ord = compare_by(by, a, b);
        match order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    });
    sorted
}

fn compare_by(by: SortBy, a: &Document, b: &Document) -> Ordering {
    match by {
        SortBy::Name => compare_titles(&a.title, &b.title),
        SortBy::Version => compare_versions(&a.version, &b.version),
        SortBy::CreatedDate => compare_created_dates(&a.created_at, &b.created_at),
    }
}

/// Case-insensitive title comparison with a byte-order tie-break, so that
/// `"apple"` sorts next to `"Apple"` rather than after `"Zebra"`.
pub fn compare_titles(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Compare two ISO-8601 timestamps, newer first.
///
/// A timestamp that cannot be parsed ranks as older than any valid one.
pub fn compare_created_dates(a: &str, b: &str) -> Ordering {
    parse_timestamp_millis(b).cmp(&parse_timestamp_millis(a))
}

/// Parse an RFC 3339 timestamp, a naive date-time, or a bare date into
/// milliseconds since the Unix epoch. Naive values are read as UTC.
pub fn parse_timestamp_millis(ts: &str) -> Option<i64> {
    let ts = ts.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(ts) {
        return Some(dt.timestamp_millis());
    }
    if let Ok(ndt) = NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(ndt.and_utc().timestamp_millis());
    }
    NaiveDate::parse_from_str(ts, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ndt| ndt.and_utc().timestamp_millis())
}

/// Sort selection state as driven by the sort bar.
///
/// Selecting the active key flips the order; selecting another key switches
/// to it in ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortState {
    pub by: SortBy,
    pub order: SortOrder,
}

impl SortState {
    pub fn new(by: SortBy, order: SortOrder) -> Self {
        Self { by, order }
    }

    pub fn select(&mut self, by: SortBy) {
        if self.by == by {
            self.order = self.order.toggled();
        } else {
            self.by = by;
            self.order = SortOrder::Asc;
        }
    }

    pub fn toggle_order(&mut self) {
        self.order = self.order.toggled();
    }

    pub fn apply(&self, documents: &[Document]) -> Vec<Document> {
        sort_documents(documents, self.by, self.order)
    }
}
