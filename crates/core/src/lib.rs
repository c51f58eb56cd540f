#![warn(clippy::all, missing_docs)]

//! Core domain logic for GameShelf.
//!
//! This crate hosts the game records, the funds ledger, price
//! normalisation, configuration handling and the JSON persistence
//! layer used by the terminal UI and any future frontends.

pub mod catalog;
pub mod config;
pub mod error;
pub mod ledger;
pub mod models;
pub mod price;
pub mod store;

pub use catalog::{Catalog, CatalogSummary};
pub use config::AppConfig;
pub use error::{CatalogError, LedgerError, PriceError};
pub use ledger::Ledger;
pub use models::{Game, GameId, GameStatus};
pub use store::{LoadedState, Store};
