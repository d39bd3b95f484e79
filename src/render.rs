//! Terminal output: the document grid and toasts.
//!
//! The controller talks to the [`GridRenderer`] and
//! [`ToastSink`](doc_catalog_core::toast::ToastSink) traits only; the
//! implementations here print to stdout.

use std::sync::{Mutex, PoisonError};

use doc_catalog_core::grid::GridRow;
use doc_catalog_core::sort::SortState;
use doc_catalog_core::toast::{Toast, ToastSink};

/// Display surface for the document grid.
pub trait GridRenderer: Send + Sync {
    /// Replace whatever is shown with `rows`, already in display order.
    fn render(&self, rows: &[GridRow], sort: SortState);
}

const HEADERS: [&str; 5] = ["TITLE", "VERSION", "CONTRIBUTORS", "ATTACHMENTS", "CREATED"];
const MAX_COLUMN_WIDTH: usize = 40;

/// Lay `rows` out as a fixed-width table with a header line.
pub fn format_table(rows: &[GridRow], sort: SortState) -> String {
    if rows.is_empty() {
        return "No documents.\n".to_string();
    }

    let cells: Vec<[String; 5]> = rows
        .iter()
        .map(|r| {
            [
                truncate(&r.title),
                truncate(&r.version),
                truncate(&r.contributors),
                truncate(&r.attachments),
                r.created.clone(),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(|h| h.len());
    for row in &cells {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_line(&mut out, &HEADERS.map(String::from), &widths);
    let rule: usize = widths.iter().sum::<usize>() + 2 * (widths.len() - 1);
    out.push_str(&"-".repeat(rule));
    out.push('\n');
    for row in &cells {
        push_line(&mut out, row, &widths);
    }
    out.push_str(&format!(
        "{} document(s), sorted by {} ({})\n",
        rows.len(),
        sort.by,
        sort.order
    ));
    out
}

fn push_line(out: &mut String, cells: &[String; 5], widths: &[usize; 5]) {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, w)| format!("{:<width$}", cell, width = *w))
        .collect::<Vec<_>>()
        .join("  ");
    out.push_str(line.trim_end());
    out.push('\n');
}

fn truncate(s: &str) -> String {
    if s.chars().count() <= MAX_COLUMN_WIDTH {
        return s.to_string();
    }
    let mut cut: String = s.chars().take(MAX_COLUMN_WIDTH - 1).collect();
    cut.push('…');
    cut
}

/// Prints the grid to stdout on every render.
#[derive(Default)]
pub struct TerminalGridRenderer;

impl GridRenderer for TerminalGridRenderer {
    fn render(&self, rows: &[GridRow], sort: SortState) {
        print!("{}", format_table(rows, sort));
    }
}

/// Keeps the last rendered table instead of printing it.
#[derive(Default)]
pub struct CapturingGridRenderer {
    renders: Mutex<Vec<Vec<GridRow>>>,
}

impl CapturingGridRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every render so far, oldest first.
    pub fn renders(&self) -> Vec<Vec<GridRow>> {
        self.renders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last(&self) -> Option<Vec<GridRow>> {
        self.renders().pop()
    }
}

impl GridRenderer for CapturingGridRenderer {
    fn render(&self, rows: &[GridRow], _sort: SortState) {
        self.renders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(rows.to_vec());
    }
}

/// Prints toasts as `[kind] message` lines on stdout.
///
/// A terminal has nothing to dismiss, so durations are ignored.
#[derive(Default)]
pub struct TerminalToastSink;

impl ToastSink for TerminalToastSink {
    fn show(&self, toast: Toast) {
        println!("[{}] {}", toast.kind, toast.message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_catalog_core::sort::{SortBy, SortOrder};

    fn row(title: &str) -> GridRow {
        GridRow {
            id: "1".into(),
            title: title.into(),
            version: "1.0".into(),
            contributors: "Alice, Bob".into(),
            attachments: "".into(),
            created: "2 days ago".into(),
        }
    }

    #[test]
    fn test_empty_table() {
        assert_eq!(format_table(&[], SortState::default()), "No documents.\n");
    }

    #[test]
    fn test_table_layout() {
        let out = format_table(
            &[row("Alpha"), row("Beta")],
            SortState::new(SortBy::Version, SortOrder::Desc),
        );
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines[0].starts_with("TITLE"));
        assert!(lines[1].starts_with("----"));
        assert!(lines[2].starts_with("Alpha"));
        assert!(lines[2].contains("Alice, Bob"));
        assert!(lines[3].starts_with("Beta"));
        assert!(lines[4].contains("sorted by version (desc)"));
    }

    #[test]
    fn test_long_cells_are_truncated() {
        let long = "x".repeat(100);
        let out = format_table(&[row(&long)], SortState::default());
        assert!(!out.contains(&long));
        assert!(out.contains('…'));
    }

    #[test]
    fn test_capturing_renderer_keeps_history() {
        let renderer = CapturingGridRenderer::new();
        renderer.render(&[row("A")], SortState::default());
        renderer.render(&[row("A"), row("B")], SortState::default());
        assert_eq!(renderer.renders().len(), 2);
        assert_eq!(renderer.last().unwrap().len(), 2);
    }
}
