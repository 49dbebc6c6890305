// site-listings/src/config.rs

use anyhow::{Context, Result};
use directories::ProjectDirs;
use notify::{recommended_watcher, Event, RecursiveMode, Watcher};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}, sync::Arc, time::Duration};
use tokio::sync::broadcast;

pub const DEFAULT_LECTURES_URL: &str = "lectures.json";
pub const DEFAULT_OFFICERS_URL: &str = "/officers/officers.json";
pub const DEFAULT_DATE_FORMAT: &str = "%b %-d, %Y";

/// Config is merged: system -> user -> workspace -> runtime (ephemeral)
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub site: SiteConfig,
    pub fetch: FetchConfig,
    pub lectures: LecturesConfig,
    pub officers: OfficersConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct SiteConfig {
    pub root: Option<PathBuf>,      // local site directory
    pub base_url: Option<String>,   // wins over `root` when set
    pub page: Option<String>,       // page hosting the widgets, e.g. "lectures/index.html"
    pub out_dir: Option<PathBuf>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_secs: Option<u64>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct LecturesConfig {
    pub enabled: Option<bool>,
    pub data_url: Option<String>,
    pub date_format: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct OfficersConfig {
    pub enabled: Option<bool>,
    pub data_url: Option<String>,
    pub layout_hook: Option<LayoutHookConfig>,
}

/// Command run after a non-empty roster render. Written either as a
/// command line (`layout_hook: "./relayout.sh --grid"`) or as `{cmd, args}`.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
#[serde(from = "LayoutHookRepr")]
pub struct LayoutHookConfig {
    pub cmd: String,
    pub args: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LayoutHookRepr {
    Line(String),
    Full { cmd: String, #[serde(default)] args: Vec<String> },
}

impl From<LayoutHookRepr> for LayoutHookConfig {
    fn from(r: LayoutHookRepr) -> Self {
        match r {
            LayoutHookRepr::Line(line) => {
                let mut parts = line.split_whitespace().map(str::to_string);
                let cmd = parts.next().unwrap_or_default();
                Self { cmd, args: parts.collect() }
            }
            LayoutHookRepr::Full { cmd, args } => Self { cmd, args },
        }
    }
}

impl Config {
    pub fn lectures_enabled(&self) -> bool { self.lectures.enabled.unwrap_or(true) }
    pub fn officers_enabled(&self) -> bool { self.officers.enabled.unwrap_or(true) }

    pub fn lectures_url(&self) -> &str {
        self.lectures.data_url.as_deref().unwrap_or(DEFAULT_LECTURES_URL)
    }

    pub fn officers_url(&self) -> &str {
        self.officers.data_url.as_deref().unwrap_or(DEFAULT_OFFICERS_URL)
    }

    pub fn date_format(&self) -> &str {
        self.lectures.date_format.as_deref().unwrap_or(DEFAULT_DATE_FORMAT)
    }

    pub fn timeout(&self) -> Option<Duration> { self.fetch.timeout_secs.map(Duration::from_secs) }

    pub fn out_dir(&self) -> PathBuf { self.site.out_dir.clone().unwrap_or_else(|| PathBuf::from("out")) }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Scope { System, User, Workspace, Runtime }

#[derive(Clone)]
pub struct ConfigManager {
    inner: Arc<RwLock<Config>>,
    runtime_overlay: Arc<RwLock<Config>>,
    tx: broadcast::Sender<Config>,
    _watcher: Arc<RwLock<Option<notify::RecommendedWatcher>>>,
    system_dir: PathBuf,
    user_dir: PathBuf,
    workspace_dir: PathBuf,
}

impl ConfigManager {
    pub fn load(workspace_root: impl AsRef<Path>) -> Result<Self> {
        let proj = ProjectDirs::from("org", "site-listings", "site-listings").context("ProjectDirs")?;
        let system_dir = if cfg!(target_os="windows") { PathBuf::from(r"C:\ProgramData\SiteListings") } else { PathBuf::from("/etc/site-listings") };
        Self::with_dirs(system_dir, proj.config_dir().to_path_buf(), workspace_root.as_ref().join(".site-listings"))
    }

    /// Build a manager over explicit layer directories. Missing directories are empty layers.
    pub fn with_dirs(system_dir: PathBuf, user_dir: PathBuf, workspace_dir: PathBuf) -> Result<Self> {
        let m = Self {
            inner: Arc::new(RwLock::new(Config::default())),
            runtime_overlay: Arc::new(RwLock::new(Config::default())),
            tx: broadcast::channel(64).0,
            _watcher: Arc::new(RwLock::new(None)),
            system_dir, user_dir, workspace_dir,
        };
        m.reload_all()?;
        Ok(m)
    }

    fn read_yaml_dir(dir: &Path) -> Config {
        // Merge all *.yaml in directory (lexicographic order)
        let mut cfg = Config::default();
        let Ok(rd) = fs::read_dir(dir) else { return cfg; };
        let mut files: Vec<PathBuf> = rd.filter_map(|e| e.ok().map(|x| x.path()))
                                        .filter(|p| p.extension().is_some_and(|e| e=="yaml"||e=="yml"))
                                        .collect();
        files.sort();
        for f in files {
            let Ok(text) = fs::read_to_string(&f) else { continue; };
            match serde_yml::from_str::<Config>(&text) {
                Ok(part) => merge(&mut cfg, &part),
                Err(e) => tracing::warn!(file = %f.display(), error = %e, "skipping unparsable config file"),
            }
        }
        cfg
    }

    fn merged(system: &Path, user: &Path, workspace: &Path, runtime: &Config) -> Config {
        let mut cfg = Config::default();
        merge(&mut cfg, &Self::read_yaml_dir(system));
        merge(&mut cfg, &Self::read_yaml_dir(user));
        merge(&mut cfg, &Self::read_yaml_dir(workspace));
        merge(&mut cfg, runtime);
        cfg
    }

    pub fn reload_all(&self) -> Result<()> {
        let rt = self.runtime_overlay.read().clone();
        let merged = Self::merged(&self.system_dir, &self.user_dir, &self.workspace_dir, &rt);
        *self.inner.write() = merged.clone();
        let _ = self.tx.send(merged);
        Ok(())
    }

    /// Watch the layer directories; each change re-merges and broadcasts.
    /// The workspace directory is created so new config files get picked up.
    pub fn start_watch(&mut self) -> Result<()> {
        let system = self.system_dir.clone();
        let user = self.user_dir.clone();
        let workspace = self.workspace_dir.clone();
        let tx = self.tx.clone();
        let inner = self.inner.clone();
        let runtime = self.runtime_overlay.clone();
        let mut watcher = recommended_watcher(move |res: Result<Event, _>| {
            if res.is_err() { return; }
            let rt = runtime.read().clone();
            let cfg = ConfigManager::merged(&system, &user, &workspace, &rt);
            if *inner.read() == cfg { return; }
            *inner.write() = cfg.clone();
            let _ = tx.send(cfg);
        })?;
        fs::create_dir_all(&self.workspace_dir)
            .with_context(|| format!("create {}", self.workspace_dir.display()))?;
        let mut watched = 0;
        for d in [&self.system_dir, &self.user_dir, &self.workspace_dir] {
            if !d.is_dir() { continue; }
            watcher.watch(d, RecursiveMode::NonRecursive)
                .with_context(|| format!("watch {}", d.display()))?;
            watched += 1;
        }
        if watched == 0 { tracing::warn!("no config directory could be watched; changes will not be picked up"); }
        *self._watcher.write() = Some(watcher);
        Ok(())
    }

    pub fn get(&self) -> Config { self.inner.read().clone() }
    pub fn subscribe(&self) -> broadcast::Receiver<Config> { self.tx.subscribe() }

    /// In-memory overlay (not persisted).
    pub fn apply_runtime_overlay(&self, patch: Config) -> Result<()> {
        {
            let mut rt = self.runtime_overlay.write();
            merge(&mut rt, &patch);
        }
        self.reload_all()
    }

    /// Persist a patch into one scope directory as `<name>`.
    pub fn write_patch_file(&self, scope: Scope, name: &str, patch: &Config) -> Result<PathBuf> {
        let dir = match scope {
            Scope::System => &self.system_dir,
            Scope::User => &self.user_dir,
            Scope::Workspace => &self.workspace_dir,
            Scope::Runtime => anyhow::bail!("runtime scope is not persisted"),
        };
        fs::create_dir_all(dir)?;
        let path = dir.join(name);
        let text = serde_yml::to_string(patch).context("serialize config yaml")?;
        fs::write(&path, text).with_context(|| format!("write {}", path.display()))?;
        self.reload_all()?;
        Ok(path)
    }
}

fn merge(a: &mut Config, b: &Config) {
    macro_rules! ov { ($dst:expr, $src:expr) => { if $src.is_some() { $dst = $src.clone(); } } }

    // site
    ov!(a.site.root, b.site.root);
    ov!(a.site.base_url, b.site.base_url);
    ov!(a.site.page, b.site.page);
    ov!(a.site.out_dir, b.site.out_dir);

    // fetch
    ov!(a.fetch.timeout_secs, b.fetch.timeout_secs);

    // widgets
    ov!(a.lectures.enabled, b.lectures.enabled);
    ov!(a.lectures.data_url, b.lectures.data_url);
    ov!(a.lectures.date_format, b.lectures.date_format);
    ov!(a.officers.enabled, b.officers.enabled);
    ov!(a.officers.data_url, b.officers.data_url);
    ov!(a.officers.layout_hook, b.officers.layout_hook);
}
