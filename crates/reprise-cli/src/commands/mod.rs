pub mod config;
pub mod fetch;
pub mod playlist;
pub mod scan;
pub mod tags;

pub use config::show_config;
pub use fetch::{run_fetch, FetchArgs};
pub use playlist::run_playlist;
pub use scan::run_scan;
pub use tags::run_tags;
