// site-listings/src/site.rs

use anyhow::{Context, Result};
use serde::Serialize;
use std::{fs, path::{Path, PathBuf}, sync::Arc};
use tracing::{info, warn};

use crate::{
    config::Config,
    fetch::{Fetcher, SiteFetcher},
    lectures::{ErrorReport, LectureBoard, LectureLoader},
    officers::{CommandLayoutHook, LayoutHook, RosterGrid, RosterLoader},
    page::HostPage,
};

/// Outcome of one page load across both widgets.
#[derive(Clone, Debug)]
pub struct Rendered {
    pub lectures: Option<LectureOutcome>,
    pub roster: Option<RosterGrid>,
    pub roster_count: Option<usize>,
}

#[derive(Clone, Debug)]
pub struct LectureOutcome {
    pub board: LectureBoard,
    pub result: Result<usize, ErrorReport>,
}

/// Machine-readable summary for `check`.
#[derive(Clone, Debug, Serialize)]
pub struct Summary {
    pub lectures: Option<LectureSummary>,
    pub officers: Option<usize>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum LectureSummary {
    Ok { rendered: usize },
    Failed(ErrorReport),
}

impl Rendered {
    pub fn summary(&self) -> Summary {
        Summary {
            lectures: self.lectures.as_ref().map(|l| match &l.result {
                Ok(n) => LectureSummary::Ok { rendered: *n },
                Err(r) => LectureSummary::Failed(r.clone()),
            }),
            officers: self.roster_count,
        }
    }

    pub fn lectures_failed(&self) -> bool {
        self.lectures.as_ref().is_some_and(|l| l.result.is_err())
    }

    /// Writes `lectures.html` / `officers.html` for each widget that is on the page.
    pub fn write_fragments(&self, out_dir: &Path) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(out_dir).with_context(|| format!("create {}", out_dir.display()))?;
        let mut written = vec![];
        if let Some(l) = &self.lectures {
            let p = out_dir.join("lectures.html");
            fs::write(&p, l.board.to_html()).with_context(|| format!("write {}", p.display()))?;
            written.push(p);
        }
        if let Some(g) = &self.roster {
            let p = out_dir.join("officers.html");
            fs::write(&p, g.to_html()).with_context(|| format!("write {}", p.display()))?;
            written.push(p);
        }
        Ok(written)
    }
}

pub fn fetcher_for(cfg: &Config) -> Result<Arc<dyn Fetcher>> {
    let page = cfg.site.page.as_deref();
    if let Some(base) = cfg.site.base_url.as_deref() {
        return Ok(Arc::new(SiteFetcher::http(base, page, cfg.timeout())?));
    }
    let root = cfg.site.root.clone().unwrap_or_else(|| PathBuf::from("."));
    Ok(Arc::new(SiteFetcher::local(root, page)))
}

/// Host page from the local site root, if one is configured and readable.
/// Without one the lecture containers are assumed present and the roster is
/// present only when `officers.data_url` is configured.
pub fn host_page(cfg: &Config) -> HostPage {
    let fallback = || HostPage::assumed(cfg.officers.data_url.is_some());
    let (Some(root), Some(page)) = (cfg.site.root.as_ref(), cfg.site.page.as_deref()) else {
        return fallback();
    };
    if cfg.site.base_url.is_some() { return fallback(); }
    let path = root.join(page.trim_start_matches('/'));
    match fs::read_to_string(&path) {
        Ok(html) => HostPage::parse(&html),
        Err(e) => {
            warn!(page = %path.display(), error = %e, "host page unreadable; falling back to configured widgets");
            fallback()
        }
    }
}

fn layout_hook(cfg: &Config) -> Option<Arc<dyn LayoutHook>> {
    let h = cfg.officers.layout_hook.as_ref().filter(|h| !h.cmd.trim().is_empty())?;
    Some(Arc::new(CommandLayoutHook { cmd: h.cmd.clone(), args: h.args.clone() }))
}

/// One page load: both widgets run concurrently against the same fetcher.
pub async fn render(cfg: &Config, fetcher: Arc<dyn Fetcher>, page: &HostPage) -> Rendered {
    let lectures = async {
        if !cfg.lectures_enabled() { return None; }
        if !page.has_lecture_surface() {
            warn!(missing = ?page.missing_lecture_ids, "lecture containers missing from page");
            return None;
        }
        let loader = LectureLoader {
            fetcher: fetcher.clone(),
            data_url: cfg.lectures_url().to_string(),
            date_format: cfg.date_format().to_string(),
        };
        let mut board = LectureBoard::default();
        let result = loader.load(&mut board).await.map_err(|e| e.report());
        Some(LectureOutcome { board, result })
    };

    let roster = async {
        if !cfg.officers_enabled() { return (None, None); }
        let Some(target) = page.roster.as_ref() else { return (None, None); };
        let loader = RosterLoader {
            fetcher: fetcher.clone(),
            default_url: cfg.officers_url().to_string(),
            layout_hook: layout_hook(cfg),
        };
        let mut grid = RosterGrid::new(target);
        let count = loader.load(Some(target), &mut grid).await;
        (Some(grid), count)
    };

    let (lectures, (roster, roster_count)) = futures::join!(lectures, roster);
    info!(lectures = lectures.is_some(), roster = roster.is_some(), "page load finished");
    Rendered { lectures, roster, roster_count }
}
