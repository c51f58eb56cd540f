//! The game library: active and trashed collections plus the funds ledger.
//!
//! Every mutating call writes the whole library back through the [`Store`]
//! before returning. A failed write is logged and otherwise ignored, so the
//! in-memory state stays authoritative for the rest of the session.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, error, info, warn};

use crate::{
    error::CatalogError,
    ledger::Ledger,
    models::{Game, GameId, GameStatus},
    price,
    store::Store,
};

/// Counts shown alongside the library.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogSummary {
    /// Games outside the trash.
    pub active: usize,
    /// Active games marked as paid.
    pub paid: usize,
    /// Active games not bought yet.
    pub unpaid: usize,
    /// Active games that were refunded.
    pub refunded: usize,
    /// Games in the trash.
    pub trashed: usize,
    /// Sum of the prices of active paid games that parse.
    pub spent: Decimal,
    /// Current ledger balance.
    pub funds: Decimal,
}

/// Owner of the library state.
#[derive(Debug)]
pub struct Catalog {
    active: Vec<Game>,
    trashed: Vec<Game>,
    next_id: GameId,
    ledger: Ledger,
    store: Store,
    last_saved_at: Option<DateTime<Utc>>,
}

impl Catalog {
    /// Load the library from `store`. Unreadable data yields an empty library.
    pub fn open(store: Store) -> Self {
        let state = store.load();
        Self {
            active: state.active,
            trashed: state.trashed,
            next_id: state.next_id,
            ledger: Ledger::new(state.funds),
            store,
            last_saved_at: None,
        }
    }

    /// Games outside the trash, most recently touched first.
    pub fn active(&self) -> &[Game] {
        &self.active
    }

    /// Games in the trash, in the order they were deleted.
    pub fn trashed(&self) -> &[Game] {
        &self.trashed
    }

    /// Identifier the next created game will receive.
    pub fn next_id(&self) -> GameId {
        self.next_id
    }

    /// Current funds balance.
    pub fn funds(&self) -> Decimal {
        self.ledger.funds()
    }

    /// Backing store.
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// When the library was last written successfully during this session.
    pub fn last_saved_at(&self) -> Option<DateTime<Utc>> {
        self.last_saved_at
    }

    /// First active game with `id`.
    pub fn get(&self, id: GameId) -> Option<&Game> {
        self.active.iter().find(|game| game.id == id)
    }

    /// First trashed game with `id`.
    pub fn get_trashed(&self, id: GameId) -> Option<&Game> {
        self.trashed.iter().find(|game| game.id == id)
    }

    /// Active games whose name contains `needle`, ignoring case.
    pub fn search(&self, needle: &str) -> Vec<&Game> {
        let needle = needle.trim().to_lowercase();
        self.active.iter().filter(|game| game.matches(&needle)).collect()
    }

    /// Add a game to the front of the library.
    ///
    /// A paid game is bought with ledger funds first; when the ledger cannot
    /// cover it nothing is created and no identifier is consumed.
    pub fn create(
        &mut self,
        name: &str,
        raw_price: &str,
        status: GameStatus,
    ) -> Result<Game, CatalogError> {
        let price = price::normalize(raw_price);
        if status == GameStatus::Paid {
            let amount = price::to_amount(&price)?;
            self.ledger.debit(amount)?;
        }

        let game = Game::new(self.next_id, name, price, status);
        self.next_id += 1;
        self.active.insert(0, game.clone());
        info!(id = game.id, name = %game.name, price = %game.price, status = %game.status, "game created");
        self.persist();
        Ok(game)
    }

    /// Replace the fields of an active game and move it to the front.
    ///
    /// Moving to paid buys the game at the new price; moving from paid to
    /// refunded gives the new price back. An unknown `id` changes nothing
    /// but the library is still written, and `Ok(None)` is returned.
    pub fn update(
        &mut self,
        id: GameId,
        name: &str,
        raw_price: &str,
        status: GameStatus,
    ) -> Result<Option<Game>, CatalogError> {
        let Some(index) = self.active.iter().position(|game| game.id == id) else {
            debug!(id, "update of unknown game ignored");
            self.persist();
            return Ok(None);
        };

        let price = price::normalize(raw_price);
        let previous = self.active[index].status;
        match (previous, status) {
            (GameStatus::Unpaid | GameStatus::Refunded, GameStatus::Paid) => {
                let amount = price::to_amount(&price)?;
                self.ledger.debit(amount)?;
            }
            (GameStatus::Paid, GameStatus::Refunded) => {
                let amount = price::to_amount(&price)?;
                self.ledger.refund(amount)?;
            }
            _ => {}
        }

        let mut game = self.active.remove(index);
        game.name = name.to_string();
        game.price = price;
        game.status = status;
        self.active.insert(0, game.clone());
        info!(id, from = %previous, to = %status, price = %game.price, "game updated");
        self.persist();
        Ok(Some(game))
    }

    /// Move the listed active games to the trash. Returns how many moved.
    pub fn soft_delete(&mut self, ids: &[GameId]) -> usize {
        let mut moved = 0;
        for &id in ids {
            if let Some(index) = self.active.iter().position(|game| game.id == id) {
                let mut game = self.active.remove(index);
                game.deleted = true;
                self.trashed.push(game);
                moved += 1;
            }
        }
        info!(requested = ids.len(), moved, "games moved to trash");
        self.persist();
        moved
    }

    /// Bring the listed trashed games back to the front of the library.
    pub fn restore(&mut self, ids: &[GameId]) -> usize {
        let mut restored = 0;
        for &id in ids {
            if let Some(index) = self.trashed.iter().position(|game| game.id == id) {
                let mut game = self.trashed.remove(index);
                game.deleted = false;
                self.active.insert(0, game);
                restored += 1;
            }
        }
        info!(requested = ids.len(), restored, "games restored");
        self.persist();
        restored
    }

    /// Permanently drop the listed games from the trash. Active games are never touched.
    pub fn purge(&mut self, ids: &[GameId]) -> usize {
        let mut purged = 0;
        for &id in ids {
            if let Some(index) = self.trashed.iter().position(|game| game.id == id) {
                self.trashed.remove(index);
                purged += 1;
            }
        }
        info!(requested = ids.len(), purged, "games purged");
        self.persist();
        purged
    }

    /// Empty the trash.
    pub fn clear_trash(&mut self) -> usize {
        let purged = self.trashed.len();
        self.trashed.clear();
        info!(purged, "trash cleared");
        self.persist();
        purged
    }

    /// Top up the ledger.
    pub fn add_funds(&mut self, amount: Decimal) -> Result<(), CatalogError> {
        self.ledger.credit(amount)?;
        info!(%amount, funds = %self.ledger.funds(), "funds added");
        self.persist();
        Ok(())
    }

    /// Totals over the current state.
    pub fn summary(&self) -> CatalogSummary {
        let mut summary = CatalogSummary {
            active: self.active.len(),
            trashed: self.trashed.len(),
            funds: self.ledger.funds(),
            ..CatalogSummary::default()
        };
        for game in &self.active {
            match game.status {
                GameStatus::Paid => {
                    summary.paid += 1;
                    match price::to_amount(&game.price) {
                        Ok(amount) => summary.spent += amount,
                        Err(err) => warn!(id = game.id, "price not counted: {err}"),
                    }
                }
                GameStatus::Unpaid => summary.unpaid += 1,
                GameStatus::Refunded => summary.refunded += 1,
            }
        }
        summary
    }

    fn persist(&mut self) {
        match self
            .store
            .save(&self.active, &self.trashed, self.next_id, self.ledger.funds())
        {
            Ok(()) => self.last_saved_at = Some(Utc::now()),
            Err(err) => {
                error!(path = %self.store.path().display(), "failed to save library: {err:#}");
            }
        }
    }
}
