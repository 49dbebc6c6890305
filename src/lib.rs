pub mod config;
pub mod fetch;
pub mod markup;
pub mod page;
pub mod lectures;
pub mod officers;
pub mod site;

pub use config::{Config, ConfigManager, Scope};
pub use fetch::{Fetcher, FetchError, Response, SiteFetcher};
pub use lectures::{ErrorReport, Lecture, LectureBoard, LectureError, LectureLoader};
pub use officers::{LayoutHook, Officer, OfficerError, RosterGrid, RosterLoader};
pub use page::{HostPage, RosterTarget};
pub use site::{render, Rendered};
