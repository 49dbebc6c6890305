// site-listings/src/officers.rs

//! Officer roster widget. Fails open: malformed entries are dropped and load
//! failures are logged, never shown.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{cmp::Ordering, sync::Arc};
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, error, info};

use crate::{
    fetch::{FetchError, Fetcher},
    markup::{Element, Node},
    page::RosterTarget,
};

const FALLBACK_AVATAR_SVG: &str = r#"<svg viewBox="0 0 24 24" xmlns="http://www.w3.org/2000/svg" aria-hidden="true" focusable="false"><path d="M12 12c2.21 0 4-1.79 4-4s-1.79-4-4-4-4 1.79-4 4 1.79 4 4 4zm0 2c-2.67 0-8 1.34-8 4v2h16v-2c0-2.66-5.33-4-8-4z"></path></svg>"#;
const AVATAR_STYLE: &str = "width: 100%; height: 100%; border-radius: 50%; object-fit: cover;";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Officer {
    pub name: String,
    pub role: String,
    pub order: f64,         // +inf when absent
    pub avatar_url: String,
}

#[derive(Debug, Error)]
pub enum OfficerError {
    #[error("HTTP {status} while fetching {url}")]
    Http { status: u16, url: String },
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("Dataset must be an array of officers.")]
    NotAnArray,
}

/// Drops non-object entries and fills defaults for the rest.
pub fn normalize(data: &Value) -> Result<Vec<Officer>, OfficerError> {
    let items = data.as_array().ok_or(OfficerError::NotAnArray)?;
    let text = |v: Option<&Value>| v.and_then(Value::as_str).map(|s| s.trim().to_string()).unwrap_or_default();
    Ok(items.iter()
        .filter_map(Value::as_object)
        .map(|it| Officer {
            name: text(it.get("name")),
            role: text(it.get("role")),
            order: it.get("order").and_then(Value::as_f64).unwrap_or(f64::INFINITY),
            avatar_url: it.get("avatar_url").and_then(Value::as_str).unwrap_or_default().to_string(),
        })
        .collect())
}

/// Locale-style comparison: case-insensitive first, lowercase before uppercase on a tie.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
        .then_with(|| b.cmp(a))
}

/// Ascending by `order`, then by name.
pub fn sort_officers(items: &mut [Officer]) {
    items.sort_by(|a, b| a.order.total_cmp(&b.order).then_with(|| compare_names(&a.name, &b.name)));
}

pub fn card(entry: &Officer) -> Element {
    let avatar = Element::new("div").class("avatar");
    let avatar = if entry.avatar_url.trim().is_empty() {
        avatar.raw(FALLBACK_AVATAR_SVG)
    } else {
        let alt = if entry.name.is_empty() { "Officer photo".to_string() } else { format!("{}'s photo", entry.name) };
        avatar.child(Element::new("img")
            .attr("src", entry.avatar_url.as_str())
            .attr("alt", alt)
            .attr("style", AVATAR_STYLE))
    };
    let name = if entry.name.is_empty() { "Unnamed" } else { entry.name.as_str() };
    Element::new("div").class("member-card")
        .child(avatar)
        .child(Element::new("h3").class("member-name").text(name))
        .child(Element::new("p").class("member-role").text(entry.role.as_str()))
}

/// The `.members-grid` container.
#[derive(Clone, Debug, PartialEq)]
pub struct RosterGrid {
    pub grid: Element,
}

impl RosterGrid {
    pub fn new(target: &RosterTarget) -> Self {
        let mut grid = Element::new("div").class("members-grid");
        if let Some(src) = &target.data_src { grid.set_attr("data-src", src.as_str()); }
        Self { grid }
    }

    pub fn render(&mut self, items: &[Officer]) {
        self.grid.children = items.iter().map(|o| Node::Element(card(o))).collect();
    }

    pub fn cards(&self) -> impl Iterator<Item = &Element> { self.grid.child_elements() }
    pub fn to_html(&self) -> String { format!("{}\n", self.grid) }
}

/// Host-page layout refresh, run after a non-empty render.
#[async_trait]
pub trait LayoutHook: Send + Sync {
    fn name(&self) -> &'static str;
    async fn refresh(&self, grid: &RosterGrid) -> Result<()>;
}

/// Runs an external command with the rendered card count in `ROSTER_CARDS`.
pub struct CommandLayoutHook { pub cmd: String, pub args: Vec<String> }

#[async_trait]
impl LayoutHook for CommandLayoutHook {
    fn name(&self) -> &'static str { "command" }
    async fn refresh(&self, grid: &RosterGrid) -> Result<()> {
        let status = Command::new(&self.cmd).args(&self.args)
            .env("ROSTER_CARDS", grid.cards().count().to_string())
            .status().await?;
        if !status.success() { anyhow::bail!("layout hook {} exited with {}", self.cmd, status); }
        Ok(())
    }
}

pub struct RosterLoader {
    pub fetcher: Arc<dyn Fetcher>,
    pub default_url: String,
    pub layout_hook: Option<Arc<dyn LayoutHook>>,
}

impl RosterLoader {
    /// Loads into `grid` when the page has one. `None` means nothing was
    /// rendered: no roster on the page, or a failure that has been logged.
    pub async fn load(&self, target: Option<&RosterTarget>, grid: &mut RosterGrid) -> Option<usize> {
        let Some(target) = target else {
            debug!("no roster container on page");
            return None;
        };
        let url = target.source(&self.default_url).to_string();
        let items = match self.fetch_sorted(&url).await {
            Ok(items) => items,
            Err(e) => {
                error!(target: "officers", url = %url, "{e}");
                return None;
            }
        };
        grid.render(&items);
        info!(count = items.len(), %url, "officers rendered");
        if !items.is_empty() {
            if let Some(hook) = &self.layout_hook {
                if let Err(e) = hook.refresh(grid).await {
                    error!(target: "officers", hook = hook.name(), "layout refresh failed: {e}");
                }
            }
        }
        Some(items.len())
    }

    pub async fn fetch_sorted(&self, url: &str) -> Result<Vec<Officer>, OfficerError> {
        let resp = self.fetcher.get(url).await?;
        if !resp.ok() {
            return Err(OfficerError::Http { status: resp.status, url: url.to_string() });
        }
        let mut items = normalize(&resp.json()?)?;
        sort_officers(&mut items);
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn names(items: &[Officer]) -> Vec<&str> { items.iter().map(|o| o.name.as_str()).collect() }

    #[test]
    fn explicit_order_then_infinity() {
        let mut items = normalize(&json!([{"order": 2, "name": "B"}, {"name": "A"}, {"order": 1, "name": "C"}])).unwrap();
        sort_officers(&mut items);
        assert_eq!(names(&items), ["C", "B", "A"]);
        assert_eq!(items[2].order, f64::INFINITY);
    }

    #[test]
    fn ties_break_on_name_case_insensitively() {
        let mut items = normalize(&json!([{"name": "bob"}, {"name": "Alice"}, {"name": "alice"}, {"name": "Carol", "order": 0.5}])).unwrap();
        sort_officers(&mut items);
        assert_eq!(names(&items), ["Carol", "alice", "Alice", "bob"]);
    }

    #[test]
    fn non_objects_are_dropped_and_fields_defaulted() {
        let items = normalize(&json!([null, 7, "x", [1], {"name": "  Dana ", "role": 3, "avatar_url": 12}])).unwrap();
        assert_eq!(items, vec![Officer { name: "Dana".into(), role: String::new(), order: f64::INFINITY, avatar_url: String::new() }]);
    }

    #[test]
    fn non_array_payload_is_an_error() {
        let err = normalize(&json!({"officers": []})).unwrap_err();
        assert_eq!(err.to_string(), "Dataset must be an array of officers.");
    }

    #[test]
    fn card_uses_image_or_fallback_icon() {
        let with_photo = card(&Officer { name: "Ada".into(), role: "Chair".into(), order: 1.0, avatar_url: "/img/ada.jpg".into() }).to_html();
        assert!(with_photo.contains(r#"<img src="/img/ada.jpg" alt="Ada&#39;s photo""#));
        assert!(with_photo.contains(r#"<h3 class="member-name">Ada</h3><p class="member-role">Chair</p>"#));

        let blank = card(&Officer { name: String::new(), role: String::new(), order: 1.0, avatar_url: "  ".into() }).to_html();
        assert!(blank.contains("<svg viewBox"));
        assert!(blank.contains(r#"<h3 class="member-name">Unnamed</h3><p class="member-role"></p>"#));
    }

    #[test]
    fn render_replaces_previous_cards() {
        let mut grid = RosterGrid::new(&RosterTarget { data_src: Some("/x.json".into()) });
        let one = Officer { name: "Ada".into(), role: String::new(), order: 1.0, avatar_url: String::new() };
        grid.render(&[one.clone(), one.clone()]);
        grid.render(&[one]);
        assert_eq!(grid.cards().count(), 1);
        assert_eq!(grid.grid.get_attr("data-src"), Some("/x.json"));
    }
}
