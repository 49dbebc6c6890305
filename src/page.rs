// site-listings/src/page.rs

use scraper::{Html, Selector};

/// Ids the lecture widget writes into.
pub const LECTURE_IDS: [&str; 4] = ["error-block", "error-json", "lecture-list", "empty-state"];
pub const ROSTER_CLASS: &str = "members-grid";

/// Roster container found on a host page.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RosterTarget {
    pub data_src: Option<String>,
}

impl RosterTarget {
    /// `data-src` when non-blank, else the fallback.
    pub fn source<'a>(&'a self, fallback: &'a str) -> &'a str {
        match self.data_src.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => s,
            _ => fallback,
        }
    }
}

/// What a host page offers to the two widgets.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HostPage {
    pub missing_lecture_ids: Vec<&'static str>,
    pub roster: Option<RosterTarget>,
}

impl HostPage {
    pub fn parse(html: &str) -> Self {
        let doc = Html::parse_document(html);
        let missing_lecture_ids = LECTURE_IDS.iter().copied()
            .filter(|id| {
                let sel = Selector::parse(&format!("[id=\"{id}\"]")).ok();
                sel.is_none_or(|s| doc.select(&s).next().is_none())
            })
            .collect();
        let roster = Selector::parse(&format!(".{ROSTER_CLASS}")).ok()
            .and_then(|s| doc.select(&s).next().map(|el| RosterTarget {
                data_src: el.value().attr("data-src").map(str::to_string),
            }));
        Self { missing_lecture_ids, roster }
    }

    /// Stand-in when no host page can be read: the lecture containers are
    /// assumed, the roster only exists when its data source is configured.
    pub fn assumed(roster_configured: bool) -> Self {
        Self {
            missing_lecture_ids: vec![],
            roster: roster_configured.then(RosterTarget::default),
        }
    }

    pub fn has_lecture_surface(&self) -> bool { self.missing_lecture_ids.is_empty() }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!doctype html><html><body>
        <div id="error-block" class="hidden"><pre id="error-json"></pre></div>
        <ul id="lecture-list"></ul>
        <p id="empty-state" class="hidden">No lectures yet.</p>
        <section><div class="members-grid wide" data-src="/data/board.json"></div></section>
    </body></html>"#;

    #[test]
    fn discovers_both_widgets() {
        let page = HostPage::parse(PAGE);
        assert!(page.has_lecture_surface());
        let roster = page.roster.unwrap();
        assert_eq!(roster.source("/officers/officers.json"), "/data/board.json");
    }

    #[test]
    fn roster_absent_and_lecture_ids_missing() {
        let page = HostPage::parse(r#"<html><body><ul id="lecture-list"></ul></body></html>"#);
        assert!(page.roster.is_none());
        assert_eq!(page.missing_lecture_ids, vec!["error-block", "error-json", "empty-state"]);
    }

    #[test]
    fn assumed_page_has_roster_only_when_configured() {
        assert!(HostPage::assumed(false).roster.is_none());
        assert!(HostPage::assumed(false).has_lecture_surface());
        assert_eq!(HostPage::assumed(true).roster, Some(RosterTarget::default()));
    }

    #[test]
    fn blank_data_src_falls_back() {
        let page = HostPage::parse(r#"<div class="members-grid" data-src="  "></div>"#);
        assert_eq!(page.roster.unwrap().source("/officers/officers.json"), "/officers/officers.json");
    }
}
