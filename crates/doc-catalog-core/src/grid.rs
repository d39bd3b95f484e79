//! Grid view model.
//!
//! [`grid_rows`] turns documents into plain display rows. It holds no state;
//! renderers take the rows and draw them however their medium requires.

use crate::models::Document;
use crate::sort::parse_timestamp_millis;

/// One rendered line of the document grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridRow {
    pub id: String,
    pub title: String,
    pub version: String,
    pub contributors: String,
    pub attachments: String,
    /// Creation time relative to "now", e.g. `"3 days ago"`.
    pub created: String,
}

const INTERVALS: [(&str, i64); 6] = [
    ("year", 31_536_000),
    ("month", 2_592_000),
    ("day", 86_400),
    ("hour", 3_600),
    ("minute", 60),
    ("second", 1),
];

/// Build display rows, keeping input order.
pub fn grid_rows(documents: &[Document], now_millis: i64) -> Vec<GridRow> {
    documents
        .iter()
        .map(|doc| GridRow {
            id: doc.id.clone(),
            title: doc.title.clone(),
            version: doc.version.clone(),
            contributors: doc.contributor_names(),
            attachments: doc
                .attachments
                .iter()
                .map(|a| a.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            created: format_relative(&doc.created_at, now_millis),
        })
        .collect()
}

/// Describe `timestamp` relative to `now_millis`.
///
/// Uses the largest whole unit that fits. Anything under a second, or in the
/// future, is `"just now"`. Unparseable input is returned unchanged.
pub fn format_relative(timestamp: &str, now_millis: i64) -> String {
    let Some(then) = parse_timestamp_millis(timestamp) else {
        return timestamp.to_string();
    };
    let seconds = (now_millis - then).div_euclid(1000);

    for (label, size) in INTERVALS {
        let value = seconds / size;
        if value >= 1 {
            let plural = if value != 1 { "s" } else { "" };
            return format!("{} {}{} ago", value, label, plural);
        }
    }
    "just now".to_string()
}
