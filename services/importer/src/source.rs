//! Source loader - reads the three cleaned CSV exports and coerces column types.
//!
//! Nothing is filtered here. A row that fails to coerce aborts the whole load,
//! the error names the file and line.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::Deserialize;
use std::path::Path;
use tokio::fs;

pub const RESULTS_FILE: &str = "results_clean.csv";
pub const SHOOTOUTS_FILE: &str = "shootouts_clean.csv";
pub const GOALS_FILE: &str = "goalscorers_clean.csv";

/// One played match (results_clean.csv)
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResultRow {
    pub date: NaiveDate,
    pub home_team: String,
    pub away_team: String,
    pub home_score: i32,
    pub away_score: i32,
    pub tournament: String,
    pub city: String,
    pub country: String,
    #[serde(deserialize_with = "flag")]
    pub neutral: bool,
}

/// One penalty shootout (shootouts_clean.csv)
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ShootoutRow {
    pub date: NaiveDate,
    pub home_team: String,
    pub away_team: String,
    pub winner: String,
    /// Empty in the source when nobody recorded who kicked first
    #[serde(default)]
    pub first_shooter: Option<String>,
}

/// One scoring event (goalscorers_clean.csv)
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GoalRow {
    pub date: NaiveDate,
    pub home_team: String,
    pub away_team: String,
    pub team: String,
    pub scorer: String,
    #[serde(deserialize_with = "minute")]
    pub minute: i32,
    #[serde(deserialize_with = "flag")]
    pub own_goal: bool,
    #[serde(deserialize_with = "flag")]
    pub penalty: bool,
}

/// All three inputs, typed and in file order
#[derive(Debug, Default)]
pub struct SourceData {
    pub results: Vec<ResultRow>,
    pub shootouts: Vec<ShootoutRow>,
    pub goals: Vec<GoalRow>,
}

/// Read and coerce the three CSV files in `dir`. Fails on the first bad row.
pub async fn load_sources(dir: &Path) -> Result<SourceData> {
    let results = parse_results(&read_source(dir, RESULTS_FILE).await?)?;
    let shootouts = parse_shootouts(&read_source(dir, SHOOTOUTS_FILE).await?)?;
    let goals = parse_goals(&read_source(dir, GOALS_FILE).await?)?;

    tracing::info!(
        results = results.len(),
        shootouts = shootouts.len(),
        goals = goals.len(),
        "source files loaded"
    );
    Ok(SourceData {
        results,
        shootouts,
        goals,
    })
}

async fn read_source(dir: &Path, name: &str) -> Result<String> {
    let path = dir.join(name);
    fs::read_to_string(&path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}

pub fn parse_results(content: &str) -> Result<Vec<ResultRow>> {
    parse_rows(content, RESULTS_FILE)
}

pub fn parse_shootouts(content: &str) -> Result<Vec<ShootoutRow>> {
    parse_rows(content, SHOOTOUTS_FILE)
}

pub fn parse_goals(content: &str) -> Result<Vec<GoalRow>> {
    parse_rows(content, GOALS_FILE)
}

fn parse_rows<T: DeserializeOwned>(content: &str, label: &str) -> Result<Vec<T>> {
    // Excel-exported CSVs carry a BOM that would otherwise glue onto the first header
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    reader
        .deserialize()
        .enumerate()
        .map(|(idx, result)| {
            // +2 for 1-indexed + header
            result.with_context(|| format!("{}: invalid row at line {}", label, idx + 2))
        })
        .collect()
}

/// Parse a boolean cell. Accepts `true`/`false` in any case and `1`/`0`.
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

/// Parse a minute cell as a float and truncate toward zero ("45.0" -> 45, "90.5" -> 90).
pub fn parse_minute(raw: &str) -> Option<i32> {
    let value: f64 = raw.trim().parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(value.trunc() as i32)
}

fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<bool, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_flag(&raw).ok_or_else(|| de::Error::custom(format!("invalid boolean '{}'", raw)))
}

fn minute<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<i32, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_minute(&raw).ok_or_else(|| de::Error::custom(format!("invalid minute '{}'", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // -------------------------------------------------------------------------
    // RESULTS
    // -------------------------------------------------------------------------

    #[test]
    fn test_parse_results_basic() {
        let csv = "date,home_team,away_team,home_score,away_score,tournament,city,country,neutral\n\
                   2000-01-01,A,B,2,1,Friendly,X,Y,False\n";
        let rows = parse_results(csv).unwrap();
        assert_eq!(
            rows,
            vec![ResultRow {
                date: date(2000, 1, 1),
                home_team: "A".into(),
                away_team: "B".into(),
                home_score: 2,
                away_score: 1,
                tournament: "Friendly".into(),
                city: "X".into(),
                country: "Y".into(),
                neutral: false,
            }]
        );
    }

    #[test]
    fn test_parse_results_column_order_and_extra_columns() {
        let csv = "neutral,date,home_team,away_team,home_score,away_score,tournament,city,country,notes\n\
                   TRUE,1872-11-30,Scotland,England,0,0,Friendly,Glasgow,Scotland,first ever\n";
        let rows = parse_results(csv).unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].neutral);
        assert_eq!(rows[0].date, date(1872, 11, 30));
        assert_eq!(rows[0].home_team, "Scotland");
    }

    #[test]
    fn test_parse_results_keeps_out_of_range_values() {
        let csv = "date,home_team,away_team,home_score,away_score,tournament,city,country,neutral\n\
                   2000-01-01,A,B,-3,1,Friendly,X,Y,0\n";
        let rows = parse_results(csv).unwrap();
        assert_eq!(rows[0].home_score, -3);
    }

    #[test]
    fn test_parse_results_bad_score_fails_whole_load() {
        let csv = "date,home_team,away_team,home_score,away_score,tournament,city,country,neutral\n\
                   2000-01-01,A,B,2,1,Friendly,X,Y,False\n\
                   2000-01-02,A,B,two,1,Friendly,X,Y,False\n";
        let err = parse_results(csv).unwrap_err();
        assert!(format!("{:#}", err).contains("line 3"));
    }

    #[test]
    fn test_parse_results_bad_date_fails() {
        let csv = "date,home_team,away_team,home_score,away_score,tournament,city,country,neutral\n\
                   01/02/2000,A,B,2,1,Friendly,X,Y,False\n";
        assert!(parse_results(csv).is_err());
    }

    #[test]
    fn test_parse_results_bad_flag_fails() {
        let csv = "date,home_team,away_team,home_score,away_score,tournament,city,country,neutral\n\
                   2000-01-01,A,B,2,1,Friendly,X,Y,maybe\n";
        let err = parse_results(csv).unwrap_err();
        assert!(format!("{:#}", err).contains("invalid boolean"));
    }

    #[test]
    fn test_parse_results_with_bom() {
        let csv = "\u{feff}date,home_team,away_team,home_score,away_score,tournament,city,country,neutral\n\
                   2000-01-01,A,B,2,1,Friendly,X,Y,False\n";
        assert_eq!(parse_results(csv).unwrap().len(), 1);
    }

    #[test]
    fn test_parse_results_empty() {
        let csv = "date,home_team,away_team,home_score,away_score,tournament,city,country,neutral\n";
        assert!(parse_results(csv).unwrap().is_empty());
    }

    // -------------------------------------------------------------------------
    // SHOOTOUTS
    // -------------------------------------------------------------------------

    #[test]
    fn test_parse_shootouts_first_shooter_optional() {
        let csv = "date,home_team,away_team,winner,first_shooter\n\
                   1967-08-22,India,Taiwan,Taiwan,\n\
                   2022-12-18,Argentina,France,Argentina,France\n";
        let rows = parse_shootouts(csv).unwrap();
        assert_eq!(rows[0].first_shooter, None);
        assert_eq!(rows[1].first_shooter.as_deref(), Some("France"));
    }

    #[test]
    fn test_parse_shootouts_missing_first_shooter_column() {
        let csv = "date,home_team,away_team,winner\n1967-08-22,India,Taiwan,Taiwan\n";
        let rows = parse_shootouts(csv).unwrap();
        assert_eq!(rows[0].first_shooter, None);
    }

    // -------------------------------------------------------------------------
    // GOALS
    // -------------------------------------------------------------------------

    #[test]
    fn test_parse_goals_minute_truncation() {
        let csv = "date,home_team,away_team,team,scorer,minute,own_goal,penalty\n\
                   2000-01-01,A,B,A,Smith,45.0,False,True\n\
                   2000-01-01,A,B,B,Jones,90.5,True,False\n";
        let rows = parse_goals(csv).unwrap();
        assert_eq!(rows[0].minute, 45);
        assert!(!rows[0].own_goal);
        assert!(rows[0].penalty);
        assert_eq!(rows[1].minute, 90);
        assert!(rows[1].own_goal);
    }

    #[test]
    fn test_parse_goals_bad_minute_fails() {
        let csv = "date,home_team,away_team,team,scorer,minute,own_goal,penalty\n\
                   2000-01-01,A,B,A,Smith,45+2,False,False\n";
        let err = parse_goals(csv).unwrap_err();
        assert!(format!("{:#}", err).contains("invalid minute"));
    }

    #[test]
    fn test_parse_goals_empty_minute_fails() {
        let csv = "date,home_team,away_team,team,scorer,minute,own_goal,penalty\n\
                   2000-01-01,A,B,A,Smith,,False,False\n";
        assert!(parse_goals(csv).is_err());
    }

    #[test]
    fn test_parse_minute() {
        assert_eq!(parse_minute("45"), Some(45));
        assert_eq!(parse_minute(" 45.0 "), Some(45));
        assert_eq!(parse_minute("120.9"), Some(120));
        assert_eq!(parse_minute("NaN"), None);
        assert_eq!(parse_minute("inf"), None);
        assert_eq!(parse_minute("abc"), None);
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("True"), Some(true));
        assert_eq!(parse_flag("FALSE"), Some(false));
        assert_eq!(parse_flag("1"), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("yes"), None);
        assert_eq!(parse_flag(""), None);
    }

    #[tokio::test]
    async fn test_load_sources_missing_dir_fails() {
        let err = load_sources(Path::new("/nonexistent/csvs")).await.unwrap_err();
        assert!(err.to_string().contains(RESULTS_FILE));
    }
}
