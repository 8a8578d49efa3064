use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates;
use crate::store::BlockData;

/// Workflow marker leading a task block. The vocabulary is fixed by the
/// store's text grammar; the user preference only decides which marker new
/// tasks are created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Marker {
    Todo,
    Later,
    Now,
    Doing,
    Waiting,
    Done,
    Canceled,
}

impl Marker {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "TODO" => Some(Self::Todo),
            "LATER" => Some(Self::Later),
            "NOW" => Some(Self::Now),
            "DOING" => Some(Self::Doing),
            "WAITING" => Some(Self::Waiting),
            "DONE" => Some(Self::Done),
            "CANCELED" | "CANCELLED" => Some(Self::Canceled),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "TODO",
            Self::Later => "LATER",
            Self::Now => "NOW",
            Self::Doing => "DOING",
            Self::Waiting => "WAITING",
            Self::Done => "DONE",
            Self::Canceled => "CANCELED",
        }
    }

    pub fn is_completed(self) -> bool {
        matches!(self, Self::Done | Self::Canceled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    A,
    B,
    C,
    None,
}

impl Priority {
    fn from_token(token: &str) -> Self {
        match token {
            "[#A]" => Self::A,
            "[#B]" => Self::B,
            "[#C]" => Self::C,
            _ => Self::None,
        }
    }
}

/// The unit of work: one block parsed into structure. `raw` keeps the
/// original text so mutations can rewrite single tokens instead of
/// regenerating the block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub content: String,
    pub completed: bool,
    pub marker: Marker,
    pub priority: Priority,
    pub scheduled: Option<NaiveDate>,
    pub page_id: String,
    pub page_name: String,
    pub journal_day: Option<NaiveDate>,
    pub raw: String,
}

impl Task {
    /// Pure function of block text + page metadata. Returns None when the
    /// block is not a task (no recognized leading marker).
    pub fn parse(block: &BlockData) -> Option<Task> {
        let first_line = block.text.lines().next()?;
        let marker = Marker::from_token(first_line.split_whitespace().next()?)?;
        let scheduled = find_scheduled(&block.text);

        let stripped = strip_annotation(&block.text, "SCHEDULED:");
        let stripped = strip_annotation(&stripped, "DEADLINE:");
        let content = extract_content(&stripped, marker);

        Some(Task {
            id: block.id.clone(),
            content,
            completed: marker.is_completed(),
            marker,
            priority: first_priority(first_line),
            scheduled,
            page_id: block.page_id.clone(),
            page_name: block.page_name.clone(),
            journal_day: block.journal_day,
            raw: block.text.clone(),
        })
    }
}

fn first_priority(first_line: &str) -> Priority {
    // Priority token sits directly after the marker
    first_line
        .split_whitespace()
        .nth(1)
        .map(Priority::from_token)
        .unwrap_or(Priority::None)
}

fn find_scheduled(text: &str) -> Option<NaiveDate> {
    let idx = text.find("SCHEDULED:")?;
    let rest = &text[idx + "SCHEDULED:".len()..];
    let open = rest.find('<')?;
    let close = rest[open..].find('>')? + open;
    dates::parse_scheduled_date(&rest[open + 1..close])
}

/// Remove `KEYWORD: <...>` occurrences. A keyword without a well-formed
/// stamp is dropped through the end of its line.
fn strip_annotation(text: &str, keyword: &str) -> String {
    let mut out = String::new();
    let mut rest = text;
    while let Some(idx) = rest.find(keyword) {
        out.push_str(&rest[..idx]);
        let after = &rest[idx + keyword.len()..];
        let after_ws = after.trim_start();
        if let Some(stamp) = after_ws.strip_prefix('<') {
            if let Some(close) = stamp.find('>') {
                rest = &stamp[close + 1..];
                continue;
            }
        }
        match after.find('\n') {
            Some(nl) => rest = &after[nl..],
            None => rest = "",
        }
    }
    out.push_str(rest);
    out
}

fn extract_content(stripped: &str, marker: Marker) -> String {
    let mut lines = stripped.lines();
    let first = lines.next().unwrap_or("").trim_start();
    let mut body = first
        .strip_prefix(marker.as_str())
        .unwrap_or(first)
        .trim_start();
    // Canceled blocks may use the alternate spelling
    if marker == Marker::Canceled {
        body = body.strip_prefix("CANCELLED").unwrap_or(body).trim_start();
    }
    for token in ["[#A]", "[#B]", "[#C]"] {
        if let Some(rest) = body.strip_prefix(token) {
            body = rest.trim_start();
            break;
        }
    }

    let mut content = body.trim_end().to_string();
    for line in lines {
        let line = line.trim_end();
        if line.trim().is_empty() {
            continue;
        }
        content.push('\n');
        content.push_str(line);
    }
    content.trim().to_string()
}

/// Replace the leading marker token, leaving everything else untouched.
pub fn rewrite_marker(raw: &str, marker: Marker) -> String {
    let indent_len = raw.len() - raw.trim_start().len();
    let rest = &raw[indent_len..];
    let end = rest
        .find(|c: char| c.is_whitespace())
        .unwrap_or(rest.len());
    format!("{}{}{}", &raw[..indent_len], marker.as_str(), &rest[end..])
}

/// Replace, append, or remove the scheduled annotation. None removes the
/// whole annotation with no residual token or blank line.
pub fn rewrite_scheduled(raw: &str, date: Option<NaiveDate>) -> String {
    let lines: Vec<&str> = raw.lines().collect();
    let pos = lines
        .iter()
        .position(|l| l.trim_start().starts_with("SCHEDULED:"));

    match (pos, date) {
        (Some(i), Some(d)) => {
            let indent = &lines[i][..lines[i].len() - lines[i].trim_start().len()];
            let mut out: Vec<String> = lines.iter().map(|l| l.to_string()).collect();
            out[i] = format!("{}SCHEDULED: {}", indent, dates::scheduled_stamp(d));
            out.join("\n")
        }
        (Some(i), None) => {
            let kept: Vec<&str> = lines
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, l)| *l)
                .collect();
            kept.join("\n").trim_end().to_string()
        }
        (None, Some(d)) => {
            // Inline annotations only occur in pre-existing text; new ones
            // always go on their own line
            format!(
                "{}\nSCHEDULED: {}",
                raw.trim_end(),
                dates::scheduled_stamp(d)
            )
        }
        (None, None) => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(text: &str) -> BlockData {
        BlockData {
            id: "b1".into(),
            text: text.into(),
            page_id: "p1".into(),
            page_name: "Mar 5th, 2024".into(),
            journal_day: NaiveDate::from_ymd_opt(2024, 3, 5),
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_marker_priority_and_inline_scheduled() {
        let task = Task::parse(&block("TODO [#A] Buy milk SCHEDULED: <2024-03-01>")).unwrap();
        assert_eq!(task.content, "Buy milk");
        assert_eq!(task.priority, Priority::A);
        assert!(!task.completed);
        assert_eq!(task.marker, Marker::Todo);
        assert_eq!(task.scheduled, Some(day(2024, 3, 1)));
    }

    #[test]
    fn parses_scheduled_on_own_line() {
        let task = Task::parse(&block("LATER Water plants\nSCHEDULED: <2024-03-08 Fri>")).unwrap();
        assert_eq!(task.content, "Water plants");
        assert_eq!(task.scheduled, Some(day(2024, 3, 8)));
        assert_eq!(task.marker, Marker::Later);
    }

    #[test]
    fn plain_block_is_not_a_task() {
        assert!(Task::parse(&block("Buy milk")).is_none());
        assert!(Task::parse(&block("todo lowercase is not a marker")).is_none());
        assert!(Task::parse(&block("")).is_none());
    }

    #[test]
    fn done_and_canceled_are_completed() {
        assert!(Task::parse(&block("DONE Ship release")).unwrap().completed);
        assert!(Task::parse(&block("CANCELED Old idea")).unwrap().completed);
        assert!(Task::parse(&block("CANCELLED Older idea")).unwrap().completed);
        assert!(!Task::parse(&block("DOING Ship release")).unwrap().completed);
    }

    #[test]
    fn cancelled_alternate_spelling_strips_cleanly() {
        let task = Task::parse(&block("CANCELLED Old idea")).unwrap();
        assert_eq!(task.content, "Old idea");
    }

    #[test]
    fn malformed_scheduled_is_treated_as_absent() {
        let task = Task::parse(&block("TODO Buy milk\nSCHEDULED: <someday>")).unwrap();
        assert_eq!(task.scheduled, None);
        assert_eq!(task.content, "Buy milk");
    }

    #[test]
    fn keyword_without_stamp_is_stripped_to_end_of_line() {
        let task = Task::parse(&block("TODO Buy milk\nSCHEDULED: whenever")).unwrap();
        assert_eq!(task.scheduled, None);
        assert_eq!(task.content, "Buy milk");
    }

    #[test]
    fn deadline_annotation_is_stripped_from_content() {
        let task = Task::parse(&block("TODO File taxes\nDEADLINE: <2024-04-15 Mon>")).unwrap();
        assert_eq!(task.content, "File taxes");
    }

    #[test]
    fn priority_variants() {
        assert_eq!(
            Task::parse(&block("TODO [#B] x")).unwrap().priority,
            Priority::B
        );
        assert_eq!(
            Task::parse(&block("TODO [#C] x")).unwrap().priority,
            Priority::C
        );
        assert_eq!(
            Task::parse(&block("TODO x")).unwrap().priority,
            Priority::None
        );
    }

    #[test]
    fn page_context_is_carried_through() {
        let task = Task::parse(&block("TODO x")).unwrap();
        assert_eq!(task.page_id, "p1");
        assert_eq!(task.page_name, "Mar 5th, 2024");
        assert_eq!(task.journal_day, Some(day(2024, 3, 5)));
    }

    #[test]
    fn parsing_is_idempotent() {
        let b = block("TODO [#A] Buy milk\nSCHEDULED: <2024-03-01 Fri>");
        assert_eq!(Task::parse(&b), Task::parse(&b));
    }

    #[test]
    fn raw_text_is_retained() {
        let b = block("TODO [#A] Buy milk");
        assert_eq!(Task::parse(&b).unwrap().raw, "TODO [#A] Buy milk");
    }

    #[test]
    fn multi_line_content_is_kept() {
        let task = Task::parse(&block("TODO Plan trip\nbook hotel\nSCHEDULED: <2024-03-08 Fri>"))
            .unwrap();
        assert_eq!(task.content, "Plan trip\nbook hotel");
    }

    #[test]
    fn rewrite_marker_replaces_leading_token_only() {
        assert_eq!(
            rewrite_marker("TODO [#A] Buy milk", Marker::Done),
            "DONE [#A] Buy milk"
        );
        assert_eq!(rewrite_marker("DONE Buy milk", Marker::Later), "LATER Buy milk");
    }

    #[test]
    fn rewrite_marker_keeps_scheduled_line() {
        let raw = "TODO Buy milk\nSCHEDULED: <2024-03-01 Fri>";
        assert_eq!(
            rewrite_marker(raw, Marker::Done),
            "DONE Buy milk\nSCHEDULED: <2024-03-01 Fri>"
        );
    }

    #[test]
    fn marker_toggle_round_trips() {
        let raw = "TODO [#A] Buy milk\nSCHEDULED: <2024-03-01 Fri>";
        let done = rewrite_marker(raw, Marker::Done);
        assert_eq!(rewrite_marker(&done, Marker::Todo), raw);
    }

    #[test]
    fn rewrite_scheduled_appends_own_line() {
        let out = rewrite_scheduled("TODO Buy milk", Some(day(2024, 3, 8)));
        assert_eq!(out, "TODO Buy milk\nSCHEDULED: <2024-03-08 Fri>");
    }

    #[test]
    fn rewrite_scheduled_replaces_existing_stamp() {
        let raw = "TODO Buy milk\nSCHEDULED: <2024-03-01 Fri>";
        let out = rewrite_scheduled(raw, Some(day(2024, 3, 8)));
        assert_eq!(out, "TODO Buy milk\nSCHEDULED: <2024-03-08 Fri>");
    }

    #[test]
    fn rewrite_scheduled_none_removes_line_without_residue() {
        let raw = "TODO Buy milk\nSCHEDULED: <2024-03-01 Fri>";
        let out = rewrite_scheduled(raw, None);
        assert_eq!(out, "TODO Buy milk");
        assert!(!out.contains("SCHEDULED"));
        assert!(!out.ends_with('\n'));
    }

    #[test]
    fn rewrite_scheduled_none_on_unscheduled_is_identity() {
        assert_eq!(rewrite_scheduled("TODO Buy milk", None), "TODO Buy milk");
    }

    #[test]
    fn rewrite_scheduled_preserves_indented_annotation() {
        let raw = "TODO Buy milk\n  SCHEDULED: <2024-03-01 Fri>";
        let out = rewrite_scheduled(raw, Some(day(2024, 3, 8)));
        assert_eq!(out, "TODO Buy milk\n  SCHEDULED: <2024-03-08 Fri>");
    }

    #[test]
    fn set_then_reparse_round_trips_the_date() {
        let b = block("TODO Buy milk");
        let rewritten = rewrite_scheduled(&b.text, Some(day(2024, 3, 8)));
        let reparsed = Task::parse(&block(&rewritten)).unwrap();
        assert_eq!(reparsed.scheduled, Some(day(2024, 3, 8)));

        let removed = rewrite_scheduled(&rewritten, None);
        let reparsed = Task::parse(&block(&removed)).unwrap();
        assert_eq!(reparsed.scheduled, None);
    }
}
