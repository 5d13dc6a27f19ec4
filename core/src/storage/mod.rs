mod account_repository;
mod database;
mod remote;
mod task_repository;

#[cfg(test)]
pub(crate) mod testing;

pub use account_repository::AccountRepository;
pub use database::{Connection, Database};
pub use remote::{RemoteStore, Snapshot, SqliteRemote, Subscription};
pub use task_repository::TaskDocumentRepository;
