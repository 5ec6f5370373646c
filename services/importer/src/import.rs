//! Import stages: matches first, then the rows that hang off them.
//!
//! Every stage walks its rows in file order and commits once at the end.
//! Matches create teams, tournaments and locations as needed. Shootouts and
//! goals only look teams up, and skip rows they cannot attach to a match.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use thiserror::Error;

use crate::resolver::Resolver;
use crate::source::{GoalRow, ResultRow, ShootoutRow, SourceData};
use crate::store::{NewGoal, NewMatch, NewShootout, Store};

/// Why a dependent row was left out
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SkipReason {
    #[error("missing data in row {index}: {row}")]
    MissingTeams { index: usize, row: String },

    #[error("home/away team not found for row {index}")]
    MissingSideTeams { index: usize },

    #[error("no match found for {date}, {home} vs {away}")]
    NoMatch {
        date: NaiveDate,
        home: String,
        away: String,
    },

    #[error("scoring team '{team}' not found")]
    UnknownScoringTeam { team: String },
}

/// Result of processing one source row
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    Inserted(u64),
    Skipped(SkipReason),
}

/// Per-stage tally. `inserted + skipped.len() == rows` always holds.
#[derive(Debug)]
pub struct StageReport {
    pub stage: &'static str,
    pub rows: usize,
    pub inserted: usize,
    pub skipped: Vec<(usize, SkipReason)>,
}

impl StageReport {
    fn new(stage: &'static str) -> Self {
        Self {
            stage,
            rows: 0,
            inserted: 0,
            skipped: Vec::new(),
        }
    }

    fn record(&mut self, index: usize, outcome: RowOutcome) {
        self.rows += 1;
        match outcome {
            RowOutcome::Inserted(id) => {
                tracing::trace!(stage = self.stage, row = index, id, "inserted");
                self.inserted += 1;
            }
            RowOutcome::Skipped(reason) => {
                tracing::warn!(stage = self.stage, row = index, "SKIPPING => {}", reason);
                self.skipped.push((index, reason));
            }
        }
    }
}

/// Counts for the whole run
#[derive(Debug)]
pub struct ImportSummary {
    pub stages: Vec<StageReport>,
    pub teams: usize,
    pub tournaments: usize,
    pub locations: usize,
    pub players: usize,
}

/// Run all three stages in dependency order with one shared resolver.
pub async fn import_all<S: Store>(data: &SourceData, store: &mut S) -> Result<ImportSummary> {
    let mut resolver = Resolver::new();

    let matches = import_matches(&data.results, &mut resolver, store).await?;
    let shootouts = import_shootouts(&data.shootouts, &resolver, store).await?;
    let goals = import_goals(&data.goals, &mut resolver, store).await?;

    Ok(ImportSummary {
        stages: vec![matches, shootouts, goals],
        teams: resolver.teams.len(),
        tournaments: resolver.tournaments.len(),
        locations: resolver.locations.len(),
        players: resolver.players.len(),
    })
}

// =============================================================================
// Matches
// =============================================================================

pub async fn import_matches<S: Store>(
    rows: &[ResultRow],
    resolver: &mut Resolver,
    store: &mut S,
) -> Result<StageReport> {
    let mut report = StageReport::new("matches");

    for (index, row) in rows.iter().enumerate() {
        let outcome = import_match(row, resolver, store)
            .await
            .with_context(|| format!("results row {}", index))?;
        report.record(index, outcome);
    }

    store.commit().await.context("Failed to commit matches")?;
    tracing::info!(
        inserted = report.inserted,
        teams = resolver.teams.len(),
        tournaments = resolver.tournaments.len(),
        locations = resolver.locations.len(),
        "results inserted into matches and referenced tables"
    );
    Ok(report)
}

async fn import_match<S: Store>(
    row: &ResultRow,
    resolver: &mut Resolver,
    store: &mut S,
) -> Result<RowOutcome> {
    let home_team_id = resolver.team(store, &row.home_team).await?;
    let away_team_id = resolver.team(store, &row.away_team).await?;
    let tournament_id = resolver.tournament(store, &row.tournament).await?;
    let location_id = resolver.location(store, &row.city, &row.country).await?;

    let match_id = store
        .insert_match(&NewMatch {
            date: row.date,
            home_team_id,
            away_team_id,
            home_score: row.home_score,
            away_score: row.away_score,
            tournament_id,
            location_id,
            neutral: row.neutral,
        })
        .await?;

    resolver.record_match((row.date, home_team_id, away_team_id), match_id);
    Ok(RowOutcome::Inserted(match_id))
}

// =============================================================================
// Shootouts
// =============================================================================

pub async fn import_shootouts<S: Store>(
    rows: &[ShootoutRow],
    resolver: &Resolver,
    store: &mut S,
) -> Result<StageReport> {
    let mut report = StageReport::new("shootouts");

    for (index, row) in rows.iter().enumerate() {
        let outcome = import_shootout(index, row, resolver, store)
            .await
            .with_context(|| format!("shootouts row {}", index))?;
        report.record(index, outcome);
    }

    store.commit().await.context("Failed to commit shootouts")?;
    tracing::info!(
        inserted = report.inserted,
        skipped = report.skipped.len(),
        "shootouts inserted"
    );
    Ok(report)
}

async fn import_shootout<S: Store>(
    index: usize,
    row: &ShootoutRow,
    resolver: &Resolver,
    store: &mut S,
) -> Result<RowOutcome> {
    let (Some(home_id), Some(away_id), Some(winner_team_id)) = (
        resolver.team_id(&row.home_team),
        resolver.team_id(&row.away_team),
        resolver.team_id(&row.winner),
    ) else {
        return Ok(RowOutcome::Skipped(SkipReason::MissingTeams {
            index,
            row: format!("{:?}", row),
        }));
    };

    // An unknown first shooter is stored as NULL rather than dropping the row
    let first_shooter_team_id = row.first_shooter.as_deref().and_then(|name| {
        let id = resolver.team_id(name);
        if id.is_none() {
            tracing::debug!(row = index, first_shooter = name, "first shooter not a known team");
        }
        id
    });

    let Some(match_id) = resolver.match_id(&(row.date, home_id, away_id)) else {
        return Ok(RowOutcome::Skipped(no_match(row.date, &row.home_team, &row.away_team)));
    };

    let id = store
        .insert_shootout(&NewShootout {
            match_id,
            winner_team_id,
            first_shooter_team_id,
        })
        .await?;
    Ok(RowOutcome::Inserted(id))
}

// =============================================================================
// Goals + players
// =============================================================================

pub async fn import_goals<S: Store>(
    rows: &[GoalRow],
    resolver: &mut Resolver,
    store: &mut S,
) -> Result<StageReport> {
    let mut report = StageReport::new("goals");

    for (index, row) in rows.iter().enumerate() {
        let outcome = import_goal(index, row, resolver, store)
            .await
            .with_context(|| format!("goalscorers row {}", index))?;
        report.record(index, outcome);
    }

    store.commit().await.context("Failed to commit goals")?;
    tracing::info!(
        inserted = report.inserted,
        skipped = report.skipped.len(),
        players = resolver.players.len(),
        "goals and players inserted"
    );
    Ok(report)
}

async fn import_goal<S: Store>(
    index: usize,
    row: &GoalRow,
    resolver: &mut Resolver,
    store: &mut S,
) -> Result<RowOutcome> {
    let (Some(home_id), Some(away_id)) = (
        resolver.team_id(&row.home_team),
        resolver.team_id(&row.away_team),
    ) else {
        return Ok(RowOutcome::Skipped(SkipReason::MissingSideTeams { index }));
    };

    let Some(match_id) = resolver.match_id(&(row.date, home_id, away_id)) else {
        return Ok(RowOutcome::Skipped(no_match(row.date, &row.home_team, &row.away_team)));
    };

    let Some(team_id) = resolver.team_id(&row.team) else {
        return Ok(RowOutcome::Skipped(SkipReason::UnknownScoringTeam {
            team: row.team.clone(),
        }));
    };

    let player_id = resolver.player(store, &row.scorer, team_id).await?;

    let id = store
        .insert_goal(&NewGoal {
            match_id,
            team_id,
            player_id,
            minute: row.minute,
            own_goal: row.own_goal,
            penalty: row.penalty,
        })
        .await?;
    Ok(RowOutcome::Inserted(id))
}

fn no_match(date: NaiveDate, home: &str, away: &str) -> SkipReason {
    SkipReason::NoMatch {
        date,
        home: home.to_string(),
        away: away.to_string(),
    }
}
