//! Shared domain models.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier assigned to a game when it is first added.
pub type GameId = u64;

/// Payment state of a game. Serialised with the literals used by the data file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameStatus {
    /// Bought with ledger funds.
    #[serde(rename = "pago")]
    Paid,
    /// Tracked but not bought yet.
    #[serde(rename = "não pago")]
    Unpaid,
    /// Bought and later refunded into the ledger.
    #[serde(rename = "reembolsado")]
    Refunded,
}

impl GameStatus {
    /// All states in display order.
    pub const ALL: [GameStatus; 3] = [GameStatus::Paid, GameStatus::Unpaid, GameStatus::Refunded];

    /// Literal stored in the data file and shown in the UI.
    pub fn label(self) -> &'static str {
        match self {
            GameStatus::Paid => "pago",
            GameStatus::Unpaid => "não pago",
            GameStatus::Refunded => "reembolsado",
        }
    }

    /// Next state in [`GameStatus::ALL`], wrapping around.
    pub fn next(self) -> Self {
        match self {
            GameStatus::Paid => GameStatus::Unpaid,
            GameStatus::Unpaid => GameStatus::Refunded,
            GameStatus::Refunded => GameStatus::Paid,
        }
    }

    /// Previous state in [`GameStatus::ALL`], wrapping around.
    pub fn previous(self) -> Self {
        match self {
            GameStatus::Paid => GameStatus::Refunded,
            GameStatus::Unpaid => GameStatus::Paid,
            GameStatus::Refunded => GameStatus::Unpaid,
        }
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A tracked game entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    /// Unique identifier across the library and the trash.
    pub id: GameId,
    /// Display name.
    pub name: String,
    /// Price in canonical display form (`R$ 1.234,56`).
    pub price: String,
    /// Payment state.
    pub status: GameStatus,
    /// Whether the game currently sits in the trash.
    #[serde(default)]
    pub deleted: bool,
}

impl Game {
    /// Build an active (not deleted) game.
    pub fn new(id: GameId, name: impl Into<String>, price: impl Into<String>, status: GameStatus) -> Self {
        Self {
            id,
            name: name.into(),
            price: price.into(),
            status,
            deleted: false,
        }
    }

    /// Case-insensitive substring match on the name. `needle` must already be lowercase.
    pub fn matches(&self, needle: &str) -> bool {
        needle.is_empty() || self.name.to_lowercase().contains(needle)
    }
}
