//! JSON persistence of the whole library in a single document.

use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{Context, Result};
use rust_decimal::{prelude::ToPrimitive, Decimal};
use serde::{de, ser, Deserialize, Deserializer, Serialize, Serializer};
use tracing::{debug, error, info};

use crate::models::{Game, GameId};

/// File name used when no explicit path is configured.
pub const DEFAULT_DATA_FILE: &str = "games.json";

/// State read back from disk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadedState {
    /// Games not in the trash, in file order.
    pub active: Vec<Game>,
    /// Games in the trash, in file order.
    pub trashed: Vec<Game>,
    /// Next identifier to hand out.
    pub next_id: GameId,
    /// Ledger balance.
    pub funds: Decimal,
}

impl LoadedState {
    fn empty() -> Self {
        Self {
            next_id: 1,
            ..Self::default()
        }
    }
}

/// Serialized representation of the data file.
#[derive(Debug, Serialize, Deserialize)]
struct LibraryDocument {
    #[serde(default)]
    games: Vec<Game>,
    #[serde(default = "first_id")]
    next_id: GameId,
    #[serde(
        default,
        serialize_with = "serialize_funds",
        deserialize_with = "deserialize_funds"
    )]
    funds: Decimal,
}

/// Reads and overwrites the data file.
#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
}

impl Store {
    /// Create a store backed by the provided file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the data file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the library, falling back to an empty one when the file is
    /// missing or unreadable. Failures are logged, never returned.
    pub fn load(&self) -> LoadedState {
        if !self.path.exists() {
            info!(path = %self.path.display(), "no data file yet, starting empty");
            return LoadedState::empty();
        }
        match self.read_document() {
            Ok(document) => {
                let state = partition(document);
                info!(
                    path = %self.path.display(),
                    active = state.active.len(),
                    trashed = state.trashed.len(),
                    funds = %state.funds,
                    "library loaded"
                );
                state
            }
            Err(err) => {
                error!(path = %self.path.display(), "failed to load library: {err:#}");
                LoadedState::empty()
            }
        }
    }

    /// Overwrite the data file with `active` followed by `trashed`.
    pub fn save(
        &self,
        active: &[Game],
        trashed: &[Game],
        next_id: GameId,
        funds: Decimal,
    ) -> Result<()> {
        let document = LibraryDocument {
            games: active.iter().chain(trashed.iter()).cloned().collect(),
            next_id,
            funds,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let serialised =
            serde_json::to_vec_pretty(&document).context("failed to serialize library")?;
        fs::write(&self.path, serialised)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        debug!(path = %self.path.display(), games = document.games.len(), "library saved");
        Ok(())
    }

    fn read_document(&self) -> Result<LibraryDocument> {
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        let document = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse {}", self.path.display()))?;
        Ok(document)
    }
}

fn partition(document: LibraryDocument) -> LoadedState {
    let next_id = document
        .games
        .iter()
        .map(|game| game.id)
        .max()
        .map_or(1, |max| max + 1);
    if next_id != document.next_id {
        debug!(stored = document.next_id, computed = next_id, "recomputed next id");
    }
    let (trashed, active): (Vec<Game>, Vec<Game>) =
        document.games.into_iter().partition(|game| game.deleted);
    LoadedState {
        active,
        trashed,
        next_id,
        funds: document.funds,
    }
}

fn first_id() -> GameId {
    1
}

fn serialize_funds<S>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let number = value
        .to_f64()
        .ok_or_else(|| <S::Error as ser::Error>::custom(format!("funds {value} out of range")))?;
    serializer.serialize_f64(number)
}

fn deserialize_funds<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let number = serde_json::Number::deserialize(deserializer)?;
    let text = number.to_string();
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|_| de::Error::custom(format!("invalid funds value '{text}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GameStatus;
    use tempfile::tempdir;

    fn game(id: GameId, name: &str, deleted: bool) -> Game {
        Game {
            id,
            name: name.to_string(),
            price: "R$ 10,00".to_string(),
            status: GameStatus::Unpaid,
            deleted,
        }
    }

    #[test]
    fn missing_file_is_an_empty_library() -> Result<()> {
        let dir = tempdir()?;
        let store = Store::new(dir.path().join("games.json"));
        let state = store.load();
        assert!(state.active.is_empty());
        assert!(state.trashed.is_empty());
        assert_eq!(state.next_id, 1);
        assert!(state.funds.is_zero());
        Ok(())
    }

    #[test]
    fn save_round_trip_keeps_order() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested").join("games.json");
        let store = Store::new(&path);

        let active = vec![game(4, "Doom", false), game(1, "Chess", false)];
        let trashed = vec![game(3, "Pong", true), game(2, "Tetris", true)];
        store.save(&active, &trashed, 5, Decimal::new(4250, 2))?;
        let first = fs::read_to_string(&path)?;

        let state = store.load();
        assert_eq!(state.active, active);
        assert_eq!(state.trashed, trashed);
        assert_eq!(state.next_id, 5);
        assert_eq!(state.funds, Decimal::new(4250, 2));

        store.save(&state.active, &state.trashed, state.next_id, state.funds)?;
        assert_eq!(fs::read_to_string(&path)?, first);
        Ok(())
    }

    #[test]
    fn load_partitions_interleaved_games() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("games.json");
        fs::write(
            &path,
            r#"{
  "games": [
    {"id": 7, "name": "A", "price": "R$ 1,00", "status": "pago", "deleted": true},
    {"id": 2, "name": "B", "price": "R$ 2,00", "status": "não pago"},
    {"id": 9, "name": "C", "price": "R$ 3,00", "status": "reembolsado", "deleted": false},
    {"id": 4, "name": "D", "price": "R$ 4,00", "status": "pago", "deleted": true}
  ],
  "next_id": 3,
  "funds": 12
}"#,
        )?;

        let state = Store::new(&path).load();
        let active: Vec<GameId> = state.active.iter().map(|g| g.id).collect();
        let trashed: Vec<GameId> = state.trashed.iter().map(|g| g.id).collect();
        assert_eq!(active, vec![2, 9]);
        assert_eq!(trashed, vec![7, 4]);
        assert_eq!(state.next_id, 10);
        assert_eq!(state.funds, Decimal::new(12, 0));
        Ok(())
    }

    #[test]
    fn absent_funds_default_to_zero() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("games.json");
        fs::write(&path, r#"{"games": []}"#)?;
        let state = Store::new(&path).load();
        assert!(state.funds.is_zero());
        assert_eq!(state.next_id, 1);
        Ok(())
    }

    #[test]
    fn corrupt_file_falls_back_to_empty() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("games.json");
        fs::write(&path, "{ not json")?;
        assert_eq!(Store::new(&path).load(), LoadedState::empty());
        Ok(())
    }

    #[test]
    fn funds_are_written_as_a_number() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("games.json");
        Store::new(&path).save(&[], &[], 1, Decimal::new(305, 1))?;
        let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path)?)?;
        assert_eq!(value["funds"], serde_json::json!(30.5));
        assert_eq!(value["next_id"], serde_json::json!(1));
        assert!(value["games"].as_array().map_or(false, |g| g.is_empty()));
        Ok(())
    }
}
