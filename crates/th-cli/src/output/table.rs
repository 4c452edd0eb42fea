//! Plain-text tables for `thub` listings and detail records.
//!
//! Cells under a status column (`implementation_status`, `coverage`,
//! `review_state`, ...) are colored by how healthy the value is.

use serde::de::DeserializeOwned;
use th_core::coverage::CoverageState;
use th_core::enums::{AutomationStatus, ImplementationStatus, Priority, RequestStatus, TestingStatus};
use th_core::freshness::ReviewState;

const MIN_COLUMN: usize = 4;
const GAP: &str = "  ";

#[derive(Clone, Copy, Debug)]
pub struct TableOptions {
    pub max_width: Option<usize>,
    pub color: bool,
}

/// How a status cell reads at a glance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Health {
    Good,
    Pending,
    Attention,
}

impl Health {
    const fn ansi(self) -> &'static str {
        match self {
            Self::Good => "32",
            Self::Pending => "33",
            Self::Attention => "31",
        }
    }

    /// Classify `value` as it appears under `column`. Unknown columns and
    /// unparseable labels stay uncolored.
    fn of(column: &str, value: &str) -> Option<Self> {
        match column {
            "implementation_status" => label(value).map(|s| match s {
                ImplementationStatus::NotStarted => Self::Attention,
                ImplementationStatus::InProgress => Self::Pending,
                ImplementationStatus::Completed | ImplementationStatus::Effective => Self::Good,
            }),
            "testing_status" => label(value).map(|s| match s {
                TestingStatus::NotTested => Self::Attention,
                TestingStatus::InProgress | TestingStatus::SubmittedToAuditor => Self::Pending,
                TestingStatus::Effective => Self::Good,
            }),
            "automation_status" => label(value).map(|s| match s {
                AutomationStatus::NotStarted => Self::Attention,
                AutomationStatus::InProgress => Self::Pending,
                AutomationStatus::Completed => Self::Good,
            }),
            "status" => label(value).map(|s| match s {
                RequestStatus::Open | RequestStatus::NeedsRevision => Self::Attention,
                RequestStatus::InProgress | RequestStatus::SubmittedToAuditor => Self::Pending,
                RequestStatus::Closed => Self::Good,
            }),
            "priority" => label(value).and_then(|p| match p {
                Priority::High => Some(Self::Attention),
                Priority::Medium => Some(Self::Pending),
                Priority::Low => None,
            }),
            "coverage" => label(value).map(|c| match c {
                CoverageState::Uncovered => Self::Attention,
                CoverageState::Partial => Self::Pending,
                CoverageState::Covered => Self::Good,
            }),
            "review_state" => label(value).and_then(|r| match r {
                ReviewState::Past => Some(Self::Attention),
                ReviewState::Soon => Some(Self::Pending),
                ReviewState::Healthy => Some(Self::Good),
                ReviewState::NoDate => None,
            }),
            "stale" | "missing_control_links" => (value == "true").then_some(Self::Attention),
            "has_evidence" | "acknowledged" => match value {
                "true" => Some(Self::Good),
                "false" => Some(Self::Attention),
                _ => None,
            },
            _ => None,
        }
    }
}

fn label<T: DeserializeOwned>(value: &str) -> Option<T> {
    serde_json::from_value(serde_json::Value::String(value.to_owned())).ok()
}

/// Render rows under `headers`, fitting `options.max_width` when set.
#[must_use]
pub fn render_entity_table(headers: &[&str], rows: &[Vec<String>], options: TableOptions) -> String {
    let widths = column_widths(headers, rows, options.max_width);
    let mut lines = heading(headers, &widths);
    for row in rows {
        let cells = headers.iter().zip(&widths).enumerate().map(|(idx, (column, width))| {
            let value = row.get(idx).map_or("-", String::as_str);
            cell(column, value, *width, options.color)
        });
        lines.push(cells.collect::<Vec<_>>().join(GAP));
    }
    lines.join("\n")
}

/// Render one record as `field`/`value` lines, coloring each value by its field.
#[must_use]
pub fn render_record(pairs: &[(String, String)], options: TableOptions) -> String {
    let headers = ["field", "value"];
    let rows = pairs
        .iter()
        .map(|(field, value)| vec![field.clone(), value.clone()])
        .collect::<Vec<_>>();
    let widths = column_widths(&headers, &rows, options.max_width);
    let mut lines = heading(&headers, &widths);
    for (field, value) in pairs {
        lines.push(format!(
            "{}{GAP}{}",
            cell("field", field, widths[0], false),
            cell(field, value, widths[1], options.color)
        ));
    }
    lines.join("\n")
}

fn heading(headers: &[&str], widths: &[usize]) -> Vec<String> {
    let titles = headers
        .iter()
        .zip(widths)
        .map(|(header, width)| cell("", header, *width, false))
        .collect::<Vec<_>>()
        .join(GAP);
    let rule = "-".repeat(total_width(widths));
    vec![titles, rule]
}

fn column_widths(headers: &[&str], rows: &[Vec<String>], max_width: Option<usize>) -> Vec<usize> {
    let floor = |idx: usize| headers[idx].chars().count().max(MIN_COLUMN);
    let mut widths = (0..headers.len())
        .map(|idx| {
            rows.iter()
                .filter_map(|row| row.get(idx))
                .map(|value| value.chars().count())
                .fold(floor(idx), usize::max)
        })
        .collect::<Vec<_>>();

    let Some(limit) = max_width else {
        return widths;
    };
    while total_width(&widths) > limit {
        let widest = (0..widths.len())
            .filter(|&idx| widths[idx] > floor(idx))
            .max_by_key(|&idx| widths[idx]);
        match widest {
            Some(idx) => widths[idx] -= 1,
            None => break,
        }
    }
    widths
}

fn total_width(widths: &[usize]) -> usize {
    widths.iter().sum::<usize>() + GAP.len() * widths.len().saturating_sub(1)
}

/// Pad (and clip) `value` to `width`. Counts align right; colors wrap the
/// text only so padding stays measurable.
fn cell(column: &str, value: &str, width: usize, color: bool) -> String {
    let text = clip(value, width);
    let pad = " ".repeat(width.saturating_sub(text.chars().count()));
    if value.parse::<i64>().is_ok() {
        return format!("{pad}{text}");
    }
    match Health::of(column, value).filter(|_| color) {
        Some(health) => format!("\u{1b}[{}m{text}\u{1b}[0m{pad}", health.ansi()),
        None => format!("{text}{pad}"),
    }
}

fn clip(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_string();
    }
    let mut out = value.chars().take(width.saturating_sub(1)).collect::<String>();
    out.push('…');
    out
}
