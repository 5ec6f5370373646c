//! Storage seam for the import stages.
//!
//! Stages only ever INSERT and COMMIT; id lookups are served from the resolver.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use sqlx::mysql::{MySql, MySqlArguments, MySqlPool};
use sqlx::query::Query;
use sqlx::Transaction;

/// A natural-key entity row, inserted once per distinct key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewEntity<'a> {
    Team(&'a str),
    Tournament(&'a str),
    Location { city: &'a str, country: &'a str },
    Player { name: &'a str, team_id: u64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewMatch {
    pub date: NaiveDate,
    pub home_team_id: u64,
    pub away_team_id: u64,
    pub home_score: i32,
    pub away_score: i32,
    pub tournament_id: u64,
    pub location_id: u64,
    pub neutral: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewShootout {
    pub match_id: u64,
    pub winner_team_id: u64,
    pub first_shooter_team_id: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewGoal {
    pub match_id: u64,
    pub team_id: u64,
    pub player_id: u64,
    pub minute: i32,
    pub own_goal: bool,
    pub penalty: bool,
}

/// Write side of the normalized schema. Every insert returns the generated id.
#[allow(async_fn_in_trait)]
pub trait Store {
    async fn insert_entity(&mut self, entity: NewEntity<'_>) -> Result<u64>;
    async fn insert_match(&mut self, row: &NewMatch) -> Result<u64>;
    async fn insert_shootout(&mut self, row: &NewShootout) -> Result<u64>;
    async fn insert_goal(&mut self, row: &NewGoal) -> Result<u64>;
    /// Make everything written since the previous commit durable
    async fn commit(&mut self) -> Result<()>;
}

// =============================================================================
// MariaDB
// =============================================================================

/// Writes through one pooled connection. A transaction is opened lazily on
/// the first insert and closed by `commit`; dropping it uncommitted rolls back.
pub struct MySqlStore {
    pool: MySqlPool,
    tx: Option<Transaction<'static, MySql>>,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool, tx: None }
    }

    async fn tx(&mut self) -> Result<&mut Transaction<'static, MySql>> {
        if self.tx.is_none() {
            let tx = self.pool.begin().await.context("Failed to begin transaction")?;
            self.tx = Some(tx);
        }
        self.tx.as_mut().context("transaction not open")
    }

    pub async fn close(mut self) -> Result<()> {
        self.commit().await?;
        self.pool.close().await;
        Ok(())
    }
}

impl Store for MySqlStore {
    async fn insert_entity(&mut self, entity: NewEntity<'_>) -> Result<u64> {
        let tx = self.tx().await?;
        let query: Query<'_, MySql, MySqlArguments> = match entity {
            NewEntity::Team(name) => sqlx::query("INSERT INTO teams (team_name) VALUES (?)").bind(name),
            NewEntity::Tournament(name) => {
                sqlx::query("INSERT INTO tournaments (name) VALUES (?)").bind(name)
            }
            NewEntity::Location { city, country } => {
                sqlx::query("INSERT INTO locations (city, country) VALUES (?, ?)")
                    .bind(city)
                    .bind(country)
            }
            NewEntity::Player { name, team_id } => {
                sqlx::query("INSERT INTO players (player_name, team_id) VALUES (?, ?)")
                    .bind(name)
                    .bind(team_id)
            }
        };
        let result = query
            .execute(&mut **tx)
            .await
            .with_context(|| format!("Failed to insert {:?}", entity))?;
        Ok(result.last_insert_id())
    }

    async fn insert_match(&mut self, row: &NewMatch) -> Result<u64> {
        let tx = self.tx().await?;
        let result = sqlx::query(
            r#"
            INSERT INTO matches (
                date, home_team_id, away_team_id,
                home_score, away_score,
                tournament_id, location_id, neutral
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(row.date)
        .bind(row.home_team_id)
        .bind(row.away_team_id)
        .bind(row.home_score)
        .bind(row.away_score)
        .bind(row.tournament_id)
        .bind(row.location_id)
        .bind(row.neutral)
        .execute(&mut **tx)
        .await
        .with_context(|| format!("Failed to insert match {:?}", row))?;
        Ok(result.last_insert_id())
    }

    async fn insert_shootout(&mut self, row: &NewShootout) -> Result<u64> {
        let tx = self.tx().await?;
        let result = sqlx::query(
            "INSERT INTO shootouts (match_id, winner_team_id, first_shooter_team_id) VALUES (?, ?, ?)",
        )
        .bind(row.match_id)
        .bind(row.winner_team_id)
        .bind(row.first_shooter_team_id)
        .execute(&mut **tx)
        .await
        .with_context(|| format!("Failed to insert shootout {:?}", row))?;
        Ok(result.last_insert_id())
    }

    async fn insert_goal(&mut self, row: &NewGoal) -> Result<u64> {
        let tx = self.tx().await?;
        let result = sqlx::query(
            r#"
            INSERT INTO goals (
                match_id, team_id, player_id,
                minute, own_goal, penalty
            )
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(row.match_id)
        .bind(row.team_id)
        .bind(row.player_id)
        .bind(row.minute)
        .bind(row.own_goal)
        .bind(row.penalty)
        .execute(&mut **tx)
        .await
        .with_context(|| format!("Failed to insert goal {:?}", row))?;
        Ok(result.last_insert_id())
    }

    async fn commit(&mut self) -> Result<()> {
        if let Some(tx) = self.tx.take() {
            tx.commit().await.context("Failed to commit transaction")?;
        }
        Ok(())
    }
}

// =============================================================================
// In-memory (dry runs and tests)
// =============================================================================

/// Keeps every inserted row in memory and hands out ids the way an
/// AUTO_INCREMENT column would: per table, starting at 1.
#[derive(Debug, Default)]
pub struct MemoryStore {
    pub teams: Vec<String>,
    pub tournaments: Vec<String>,
    pub locations: Vec<(String, String)>,
    pub players: Vec<(String, u64)>,
    pub matches: Vec<NewMatch>,
    pub shootouts: Vec<NewShootout>,
    pub goals: Vec<NewGoal>,
    pub commits: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    async fn insert_entity(&mut self, entity: NewEntity<'_>) -> Result<u64> {
        let id = match entity {
            NewEntity::Team(name) => {
                self.teams.push(name.to_string());
                self.teams.len() as u64
            }
            NewEntity::Tournament(name) => {
                self.tournaments.push(name.to_string());
                self.tournaments.len() as u64
            }
            NewEntity::Location { city, country } => {
                self.locations.push((city.to_string(), country.to_string()));
                self.locations.len() as u64
            }
            NewEntity::Player { name, team_id } => {
                self.players.push((name.to_string(), team_id));
                self.players.len() as u64
            }
        };
        Ok(id)
    }

    async fn insert_match(&mut self, row: &NewMatch) -> Result<u64> {
        self.matches.push(row.clone());
        Ok(self.matches.len() as u64)
    }

    async fn insert_shootout(&mut self, row: &NewShootout) -> Result<u64> {
        self.shootouts.push(row.clone());
        Ok(self.shootouts.len() as u64)
    }

    async fn insert_goal(&mut self, row: &NewGoal) -> Result<u64> {
        self.goals.push(row.clone());
        Ok(self.goals.len() as u64)
    }

    async fn commit(&mut self) -> Result<()> {
        self.commits += 1;
        Ok(())
    }
}
