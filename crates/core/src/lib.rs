#![warn(clippy::all, missing_docs)]

//! Core domain logic for the central-economy types editor.
//!
//! This crate hosts the economy file model (XML types and spawnable
//! types, JSON trader/hardline/dump files), case-insensitive classname
//! resolution, the derived-attribute calculator, the column catalog and
//! the editing session used by any frontend.

pub mod calc;
pub mod columns;
pub mod config;
pub mod files;
pub mod lookup;
pub mod model;
pub mod ops;
pub mod session;
pub mod store;

pub use calc::{AmmoProp, ItemCalculator, RecoilAxis};
pub use columns::{
    CellRenderer, CellValue, Column, ColumnId, FilterMode, FilterPredicate, MatchKind,
};
pub use config::AppConfig;
pub use files::{FileContent, FileKind, FileLocation, FileWrapper};
pub use lookup::EntityIndex;
pub use model::{EntityKind, SpawnableEntry, TraderItem, TypeEntry};
pub use ops::OpKind;
pub use session::EditorSession;
pub use store::{DiskStore, FileStore};
