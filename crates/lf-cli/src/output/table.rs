//! Plain-text tables for lead, log and stats listings.
//!
//! Columns are typed by name: ids and counts align right, status columns are
//! coloured by lifecycle outcome, timestamps are cut to the minute, and only
//! free-text columns give up width on a narrow terminal.

use lf_core::enums::{CallStatus, LeadStatus};

const MIN_WIDTH: usize = 4;
const GAP: &str = "  ";

const GREEN: &str = "32";
const YELLOW: &str = "33";
const RED: &str = "31";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ColumnKind {
    Number,
    Status,
    Timestamp,
    Text,
}

impl ColumnKind {
    fn of(name: &str) -> Self {
        match name {
            "id" | "lead_id" | "attempt_number" | "entry_attempts" | "duration" | "count" => {
                Self::Number
            }
            "status" | "call_status" | "success" => Self::Status,
            name if name.ends_with("_at") => Self::Timestamp,
            _ => Self::Text,
        }
    }
}

pub struct Table {
    headers: Vec<String>,
    kinds: Vec<ColumnKind>,
    rows: Vec<Vec<String>>,
}

impl Table {
    #[must_use]
    pub fn new(headers: &[&str]) -> Self {
        Self {
            headers: headers.iter().map(ToString::to_string).collect(),
            kinds: headers.iter().map(|h| ColumnKind::of(h)).collect(),
            rows: Vec::new(),
        }
    }

    /// Add a row. Missing trailing cells render as `-`.
    pub fn push(&mut self, mut row: Vec<String>) {
        row.resize(self.headers.len(), String::from("-"));
        for (cell, kind) in row.iter_mut().zip(&self.kinds) {
            if *kind == ColumnKind::Timestamp {
                *cell = short_timestamp(cell);
            }
        }
        self.rows.push(row);
    }

    /// Render with columns fitted to `max_width`, colouring status cells when
    /// `color` is set.
    #[must_use]
    pub fn render(&self, max_width: Option<usize>, color: bool) -> String {
        let widths = self.widths(max_width);

        let mut lines = Vec::with_capacity(self.rows.len() + 2);
        lines.push(self.line(self.headers.iter().map(String::as_str), &widths, false));
        lines.push(
            widths
                .iter()
                .map(|w| "-".repeat(*w))
                .collect::<Vec<_>>()
                .join(GAP),
        );
        for row in &self.rows {
            lines.push(self.line(row.iter().map(String::as_str), &widths, color));
        }
        lines
            .into_iter()
            .map(|line| line.trim_end().to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn line<'s>(&self, cells: impl Iterator<Item = &'s str>, widths: &[usize], color: bool) -> String {
        cells
            .zip(widths.iter().zip(&self.kinds))
            .map(|(cell, (width, kind))| {
                let text = clip(cell, *width);
                let pad = " ".repeat(width.saturating_sub(text.chars().count()));
                let painted = match status_color(&text).filter(|_| color && *kind == ColumnKind::Status) {
                    Some(code) => format!("\u{1b}[{code}m{text}\u{1b}[0m"),
                    None => text,
                };
                if *kind == ColumnKind::Number {
                    format!("{pad}{painted}")
                } else {
                    format!("{painted}{pad}")
                }
            })
            .collect::<Vec<_>>()
            .join(GAP)
    }

    fn widths(&self, max_width: Option<usize>) -> Vec<usize> {
        let mut widths: Vec<usize> = self
            .headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                self.rows
                    .iter()
                    .map(|row| row[i].chars().count())
                    .chain([header.chars().count()])
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let Some(max_width) = max_width else {
            return widths;
        };
        let gaps = GAP.len() * widths.len().saturating_sub(1);
        let fixed: usize = widths
            .iter()
            .zip(&self.kinds)
            .filter(|(_, kind)| **kind != ColumnKind::Text)
            .map(|(w, _)| *w)
            .sum();
        let budget = max_width.saturating_sub(fixed + gaps);

        // one shared cap for every text column, lowered until they fit
        let text: Vec<usize> = widths
            .iter()
            .zip(&self.kinds)
            .filter(|(_, kind)| **kind == ColumnKind::Text)
            .map(|(w, _)| *w)
            .collect();
        let mut cap = text.iter().copied().max().unwrap_or(0);
        while cap > MIN_WIDTH && text.iter().map(|w| (*w).min(cap)).sum::<usize>() > budget {
            cap -= 1;
        }
        for (w, kind) in widths.iter_mut().zip(&self.kinds) {
            if *kind == ColumnKind::Text {
                *w = (*w).min(cap);
            }
        }
        widths
    }
}

fn clip(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_string();
    }
    let mut out: String = value.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}

/// `2026-03-04T09:15:27.118+00:00` becomes `2026-03-04 09:15`.
fn short_timestamp(value: &str) -> String {
    match value.get(..16) {
        Some(head) if value.as_bytes().get(10) == Some(&b'T') => head.replacen('T', " ", 1),
        _ => value.to_string(),
    }
}

/// Green for a good outcome, red for a dead end, yellow for work in flight.
fn status_color(value: &str) -> Option<&'static str> {
    if let Ok(status) = value.parse::<LeadStatus>() {
        return Some(match status {
            LeadStatus::Confirmed | LeadStatus::Entered => GREEN,
            LeadStatus::CallFailed | LeadStatus::NotInterested | LeadStatus::EntryFailed => RED,
            _ => YELLOW,
        });
    }
    if let Ok(status) = value.parse::<CallStatus>() {
        return Some(match status {
            CallStatus::Completed => GREEN,
            CallStatus::Failed | CallStatus::Busy => RED,
            _ => YELLOW,
        });
    }
    match value {
        "true" => Some(GREEN),
        "false" => Some(RED),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn table(headers: &[&str], rows: &[&[&str]]) -> Table {
        let mut table = Table::new(headers);
        for row in rows {
            table.push(row.iter().map(ToString::to_string).collect());
        }
        table
    }

    #[test]
    fn ids_align_right_and_text_left() {
        let rendered = table(&["id", "first_name"], &[&["7", "Jane"], &["12", "Al"]]).render(None, false);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "id  first_name");
        assert_eq!(lines[1], "--  ----------");
        assert_eq!(lines[2], " 7  Jane");
        assert_eq!(lines[3], "12  Al");
    }

    #[test]
    fn timestamps_are_cut_to_the_minute() {
        let rendered = table(&["updated_at"], &[&["2026-03-04T09:15:27.118+00:00"]]).render(None, false);
        assert_eq!(rendered.lines().nth(2), Some("2026-03-04 09:15"));
    }

    #[test]
    fn narrow_terminal_shrinks_only_text_columns() {
        let rendered = table(
            &["id", "status", "error_message"],
            &[&["1", "entry_failed", "portal rejected the submission: duplicate lead"]],
        )
        .render(Some(40), false);
        let row = rendered.lines().nth(2).unwrap();
        assert!(row.chars().count() <= 40);
        assert!(row.contains("entry_failed"));
        assert!(row.ends_with('…'));
    }

    #[test]
    fn short_rows_are_padded_with_dashes() {
        let rendered = table(&["id", "phone"], &[&["3"]]).render(None, false);
        assert!(rendered.lines().nth(2).unwrap().ends_with('-'));
    }

    #[test]
    fn only_status_columns_are_colored() {
        let rendered = table(&["status", "first_name"], &[&["entered", "pending"]]).render(None, true);
        let row = rendered.lines().nth(2).unwrap();
        assert!(row.starts_with("\u{1b}[32mentered\u{1b}[0m"));
        assert!(row.ends_with("pending"));
    }

    #[test]
    fn statuses_map_to_outcome_colors() {
        assert_eq!(status_color("confirmed"), Some(GREEN));
        assert_eq!(status_color("entry_in_progress"), Some(YELLOW));
        assert_eq!(status_color("not_interested"), Some(RED));
        assert_eq!(status_color("busy"), Some(RED));
        assert_eq!(status_color("queued"), Some(YELLOW));
        assert_eq!(status_color("Jane"), None);
    }
}
