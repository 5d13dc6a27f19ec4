//! Terminal front end for dayboard: application state, key handling and
//! rendering.

pub mod app;
pub mod config;
pub mod event;
pub mod ui;

pub use app::App;
pub use config::{load_config, Config};
pub use event::{Event, EventHandler};
