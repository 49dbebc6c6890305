// site-listings/src/lectures.rs

//! Lecture archive widget. Fails closed: one malformed entry blocks the whole
//! render and the diagnostics panel shows every violation found.

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{collections::HashSet, fmt::Write, sync::{Arc, LazyLock}};
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::{
    fetch::Fetcher,
    markup::{Element, Node},
};

const HIDDEN: &str = "hidden";
const REQUIRED: [&str; 3] = ["lecture_name", "lecture_date", "slides_url"];

static ISO_DATE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("static regex"));

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Lecture {
    pub lecture_name: String,
    pub lecture_date: String,   // YYYY-MM-DD
    pub slides_url: String,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LectureError {
    #[error("Load failure: HTTP {status} while fetching {url}")]
    LoadFailure { status: u16, url: String },
    #[error("Malformed dataset: {0}")]
    MalformedDataset(String),
    #[error("Malformed entry detected: {}", .0.join("; "))]
    MalformedEntry(Vec<String>),
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// What the diagnostics panel shows, serialized as pretty JSON.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorReport {
    pub error: String,
    pub details: String,
}

impl LectureError {
    pub fn category(&self) -> &'static str {
        match self {
            Self::LoadFailure { .. } => "Load failure",
            Self::MalformedDataset(_) => "Malformed dataset",
            Self::MalformedEntry(_) => "Malformed entry detected",
            Self::Unexpected(_) => "Unexpected error",
        }
    }

    pub fn details(&self) -> String {
        match self {
            Self::LoadFailure { status, url } => format!("HTTP {status} while fetching {url}"),
            Self::MalformedDataset(d) | Self::Unexpected(d) => d.clone(),
            Self::MalformedEntry(v) => v.join("; "),
        }
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport { error: self.category().to_string(), details: self.details() }
    }
}

pub fn is_iso_date(s: &str) -> bool {
    if !ISO_DATE.is_match(s) { return false; }
    let mut it = s.split('-').map(|p| p.parse::<u32>().ok());
    match (it.next().flatten(), it.next().flatten(), it.next().flatten()) {
        (Some(y), Some(m), Some(d)) => i32::try_from(y).ok()
            .and_then(|y| NaiveDate::from_ymd_opt(y, m, d))
            .is_some(),
        _ => false,
    }
}

pub fn is_valid_url(s: &str) -> bool { Url::parse(s).is_ok() }

/// Checks every entry and collects all violations before deciding.
pub fn validate_dataset(data: &Value) -> Result<Vec<Lecture>, LectureError> {
    let Some(entries) = data.as_array() else {
        return Err(LectureError::MalformedDataset("Root must be a JSON array".into()));
    };

    let mut details = vec![];
    let mut names = HashSet::new();
    let mut out = Vec::with_capacity(entries.len());

    for (i, entry) in entries.iter().enumerate() {
        let idx = i + 1;
        let Some(obj) = entry.as_object() else {
            details.push(format!("Invalid entry {idx}: must be a JSON object"));
            continue;
        };
        let before = details.len();

        for key in REQUIRED {
            match obj.get(key) {
                None => details.push(format!("Missing field: {key} in entry {idx}")),
                Some(Value::String(s)) if !s.trim().is_empty() => {}
                Some(_) => details.push(format!("Invalid value for {key} in entry {idx}: must be a non-empty string")),
            }
        }

        let field = |key: &str| obj.get(key).and_then(Value::as_str);

        if let Some(date) = field("lecture_date") {
            if !is_iso_date(date) {
                details.push(format!("Invalid date format in entry {idx}: expected YYYY-MM-DD"));
            }
        }
        if let Some(url) = field("slides_url") {
            if !is_valid_url(url) {
                details.push(format!("Invalid slides_url in entry {idx}: must be a valid URL"));
            }
        }
        if let Some(name) = field("lecture_name") {
            let name = name.trim();
            if !names.insert(name.to_string()) {
                details.push(format!("Duplicate lecture_name detected: \"{name}\" (entry {idx})"));
            }
        }

        if details.len() == before {
            if let (Some(n), Some(d), Some(u)) = (field("lecture_name"), field("lecture_date"), field("slides_url")) {
                out.push(Lecture { lecture_name: n.into(), lecture_date: d.into(), slides_url: u.into() });
            }
        }
    }

    if !details.is_empty() {
        return Err(LectureError::MalformedEntry(details));
    }
    Ok(out)
}

/// Newest first; ISO dates order chronologically as text.
pub fn sort_lectures(items: &mut [Lecture]) {
    items.sort_by(|a, b| b.lecture_date.cmp(&a.lecture_date));
}

/// Human-readable date; the raw string when it cannot be parsed or formatted.
pub fn format_date(iso: &str, fmt: &str) -> String {
    let Ok(date) = NaiveDate::parse_from_str(iso, "%Y-%m-%d") else { return iso.to_string(); };
    let mut s = String::new();
    match write!(s, "{}", date.format(fmt)) {
        Ok(()) => s,
        Err(_) => iso.to_string(),
    }
}

/// The lecture widget's containers: diagnostics panel, list, empty-state marker.
#[derive(Clone, Debug, PartialEq)]
pub struct LectureBoard {
    pub error_block: Element,
    pub error_json: Element,
    pub list: Element,
    pub empty_state: Element,
}

impl Default for LectureBoard {
    fn default() -> Self {
        Self {
            error_block: Element::new("div").id("error-block").class("error-block hidden"),
            error_json: Element::new("pre").id("error-json"),
            list: Element::new("ul").id("lecture-list").class("lecture-list"),
            empty_state: Element::new("p").id("empty-state").class("empty-state hidden").text("No lectures available yet."),
        }
    }
}

impl LectureBoard {
    pub fn show_error(&mut self, report: &ErrorReport) {
        let text = serde_json::to_string_pretty(report)
            .unwrap_or_else(|_| format!("{}: {}", report.error, report.details));
        self.error_json.set_text(text);
        self.error_block.remove_class(HIDDEN);
    }

    pub fn hide_error(&mut self) {
        self.error_block.add_class(HIDDEN);
        self.error_json.set_text("");
    }

    pub fn render(&mut self, items: &[Lecture], date_format: &str) {
        self.list.children.clear();
        if items.is_empty() {
            self.empty_state.remove_class(HIDDEN);
            return;
        }
        self.empty_state.add_class(HIDDEN);
        for lec in items {
            let li = Element::new("li").class("lecture-item")
                .child(Element::new("div").class("lecture-name").text(lec.lecture_name.as_str()))
                .child(Element::new("div").class("lecture-date").text(format_date(&lec.lecture_date, date_format)))
                .child(Element::new("div").class("lecture-actions").child(
                    Element::new("a")
                        .attr("href", lec.slides_url.as_str())
                        .attr("target", "_blank")
                        .attr("rel", "noopener noreferrer")
                        .text("Open slides"),
                ));
            self.list.children.push(Node::Element(li));
        }
    }

    pub fn error_visible(&self) -> bool { !self.error_block.has_class(HIDDEN) }
    pub fn empty_visible(&self) -> bool { !self.empty_state.has_class(HIDDEN) }
    pub fn error_text(&self) -> String { self.error_json.text_content() }
    pub fn items(&self) -> impl Iterator<Item = &Element> { self.list.child_elements() }

    pub fn to_html(&self) -> String {
        let panel = self.error_block.clone().child(self.error_json.clone());
        format!("{panel}\n{}\n{}\n", self.list, self.empty_state)
    }
}

pub struct LectureLoader {
    pub fetcher: Arc<dyn Fetcher>,
    pub data_url: String,
    pub date_format: String,
}

impl LectureLoader {
    /// One load attempt: fetch, validate, sort, render. The outcome is also
    /// reflected on the board (panel on failure, list on success).
    pub async fn load(&self, board: &mut LectureBoard) -> Result<usize, LectureError> {
        match self.fetch_sorted().await {
            Ok(items) => {
                board.hide_error();
                board.render(&items, &self.date_format);
                info!(count = items.len(), url = %self.data_url, "lectures rendered");
                Ok(items.len())
            }
            Err(e) => {
                warn!(category = e.category(), details = %e.details(), "lecture load failed");
                board.show_error(&e.report());
                Err(e)
            }
        }
    }

    pub async fn fetch_sorted(&self) -> Result<Vec<Lecture>, LectureError> {
        let resp = self.fetcher.get(&self.data_url).await
            .map_err(|e| LectureError::Unexpected(e.to_string()))?;
        if !resp.ok() {
            return Err(LectureError::LoadFailure { status: resp.status, url: self.data_url.clone() });
        }
        let data = resp.json().map_err(|e| LectureError::Unexpected(e.to_string()))?;
        let mut items = validate_dataset(&data)?;
        sort_lectures(&mut items);
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn lecture(name: &str, date: &str) -> Value {
        json!({ "lecture_name": name, "lecture_date": date, "slides_url": "https://example.com/x" })
    }

    #[test]
    fn non_array_root_is_malformed_dataset() {
        let err = validate_dataset(&json!({"lectures": []})).unwrap_err();
        assert_eq!(err.report(), ErrorReport { error: "Malformed dataset".into(), details: "Root must be a JSON array".into() });
    }

    #[test]
    fn valid_dataset_keeps_every_entry() {
        let data = json!([lecture("Intro", "2024-01-10"), lecture("Graphs", "2024-03-02"), lecture("Heaps", "2023-11-30")]);
        let mut items = validate_dataset(&data).unwrap();
        assert_eq!(items.len(), 3);
        sort_lectures(&mut items);
        let dates: Vec<_> = items.iter().map(|l| l.lecture_date.as_str()).collect();
        assert_eq!(dates, ["2024-03-02", "2024-01-10", "2023-11-30"]);
    }

    #[test]
    fn duplicate_names_are_rejected_after_trim() {
        let data = json!([lecture("Intro", "2024-01-10"), lecture("  Intro ", "2024-02-10")]);
        let err = validate_dataset(&data).unwrap_err();
        assert_eq!(err.category(), "Malformed entry detected");
        assert_eq!(err.details(), "Duplicate lecture_name detected: \"Intro\" (entry 2)");
    }

    #[test]
    fn duplicate_reported_even_when_other_fields_are_bad() {
        let data = json!([
            {"lecture_name": "Intro", "lecture_date": "nope", "slides_url": "https://example.com/a"},
            {"lecture_name": "Intro", "lecture_date": "2024-01-01", "slides_url": "also nope"},
        ]);
        let details = validate_dataset(&data).unwrap_err().details();
        assert_eq!(details, "Invalid date format in entry 1: expected YYYY-MM-DD; \
            Invalid slides_url in entry 2: must be a valid URL; \
            Duplicate lecture_name detected: \"Intro\" (entry 2)");
    }

    #[test]
    fn calendar_invalid_date_fails_even_if_pattern_matches() {
        assert!(!is_iso_date("2024-02-30"));
        assert!(is_iso_date("2024-02-29"));
        assert!(!is_iso_date("2023-02-29"));
        assert!(!is_iso_date("2024-2-3"));
        let err = validate_dataset(&json!([lecture("Leap", "2024-02-30")])).unwrap_err();
        assert_eq!(err.details(), "Invalid date format in entry 1: expected YYYY-MM-DD");
    }

    #[test]
    fn two_digit_years_are_ordinary_calendar_dates() {
        assert!(is_iso_date("0050-01-01"));
        assert!(is_iso_date("0000-02-29"));
        assert!(validate_dataset(&json!([lecture("Antiquity", "0050-01-01")])).is_ok());
    }

    #[test]
    fn array_entry_is_an_invalid_entry_not_missing_fields() {
        let err = validate_dataset(&json!([["lecture_name", "lecture_date", "slides_url"], 42])).unwrap_err();
        assert_eq!(err.category(), "Malformed entry detected");
        assert_eq!(err.details(), "Invalid entry 1: must be a JSON object; Invalid entry 2: must be a JSON object");
    }

    #[test]
    fn generated_datasets_keep_length_and_sort_descending() {
        let base = NaiveDate::from_ymd_opt(2015, 1, 1).unwrap();
        for (n, step) in [(1usize, 1usize), (7, 3), (60, 7), (200, 37), (365, 101)] {
            // `step` is coprime with `n`, so `i * step % n` visits every day once in shuffled order
            let data: Vec<Value> = (0..n)
                .map(|i| {
                    let day = base + chrono::Days::new(((i * step) % n) as u64);
                    lecture(&format!("Lecture {i}"), &day.format("%Y-%m-%d").to_string())
                })
                .collect();
            let mut items = validate_dataset(&Value::Array(data)).unwrap();
            assert_eq!(items.len(), n);
            sort_lectures(&mut items);
            assert!(items.windows(2).all(|w| w[0].lecture_date > w[1].lecture_date), "n={n} step={step}");

            let mut board = LectureBoard::default();
            board.render(&items, "%b %-d, %Y");
            assert_eq!(board.items().count(), n);
        }
    }

    #[test]
    fn slides_url_must_parse() {
        assert!(!is_valid_url("not a url"));
        assert!(is_valid_url("https://example.com/x"));
    }

    #[test]
    fn collects_every_violation_in_entry_order() {
        let data = json!([
            {"lecture_date": "2024-01-01", "slides_url": "https://example.com/a"},
            {"lecture_name": "  ", "lecture_date": 20240101, "slides_url": "https://example.com/b"},
            "just a string",
        ]);
        let details = validate_dataset(&data).unwrap_err().details();
        assert_eq!(details, "Missing field: lecture_name in entry 1; \
            Invalid value for lecture_name in entry 2: must be a non-empty string; \
            Invalid value for lecture_date in entry 2: must be a non-empty string; \
            Invalid entry 3: must be a JSON object");
    }

    #[test]
    fn format_date_is_readable_and_falls_back() {
        assert_eq!(format_date("2024-03-05", "%b %-d, %Y"), "Mar 5, 2024");
        assert_eq!(format_date("garbage", "%b %-d, %Y"), "garbage");
    }

    #[test]
    fn empty_render_reveals_empty_state() {
        let mut board = LectureBoard::default();
        board.render(&[], "%b %-d, %Y");
        assert_eq!(board.items().count(), 0);
        assert!(board.empty_visible());
    }

    #[test]
    fn item_markup_carries_link_attributes() {
        let mut board = LectureBoard::default();
        let lec = Lecture { lecture_name: "Tries & DAGs".into(), lecture_date: "2024-04-01".into(), slides_url: "https://example.com/t".into() };
        board.render(&[lec], "%b %-d, %Y");
        assert!(!board.empty_visible());
        let html = board.list.to_html();
        assert!(html.contains(r#"<div class="lecture-name">Tries &amp; DAGs</div>"#));
        assert!(html.contains(r#"<div class="lecture-date">Apr 1, 2024</div>"#));
        assert!(html.contains(r#"<a href="https://example.com/t" target="_blank" rel="noopener noreferrer">Open slides</a>"#));
    }

    #[test]
    fn error_panel_shows_pretty_json_then_hides() {
        let mut board = LectureBoard::default();
        assert!(!board.error_visible());
        board.show_error(&LectureError::LoadFailure { status: 404, url: "lectures.json".into() }.report());
        assert!(board.error_visible());
        assert_eq!(board.error_text(), "{\n  \"error\": \"Load failure\",\n  \"details\": \"HTTP 404 while fetching lectures.json\"\n}");
        board.hide_error();
        assert!(!board.error_visible());
        assert_eq!(board.error_text(), "");
    }
}
