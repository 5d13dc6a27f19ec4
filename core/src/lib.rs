//! Core library for dayboard: task models, the remote document store and
//! the list-level state (task store, sync, reordering, note sessions and
//! the filtered/grouped view) that a front end drives.

pub mod actions;
pub mod auth;
pub mod calendar;
pub mod error;
pub mod models;
pub mod notes;
pub mod reorder;
pub mod storage;
pub mod sync;
pub mod task_store;
pub mod view;

pub use error::{Error, Result};
