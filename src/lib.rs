pub mod app;
pub mod cli;
pub mod config;
pub mod entity;
pub mod error;
pub mod export;
pub mod storage;
pub mod store;
pub mod sync;

pub use app::App;
pub use entity::{Note, NoteCollection, NoteFields};
pub use error::{Result, StudySyncError};
pub use store::NoteStore;
