//! Keyword-based column classification used to group columns in the UI and to
//! suggest calculations.

use parse_display::{Display, FromStr};
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Display, FromStr, Serialize, Deserialize)]
#[display(style = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    #[default]
    Offensive,
    Defensive,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Display, FromStr, Serialize)]
#[display(style = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ColumnCategory {
    Identifier,
    BasicStat,
    Percentage,
    Total,
    Average,
    Situational,
    Advanced,
    Unknown,
}

// Names that are identifiers only when they are the whole column name.
// "3rd Down Conversions" is situational, "Down" is not.
static IDENTIFIER_NAMES: &[&str] = &["play", "down", "dn", "distance", "dist", "id", "no"];

static IDENTIFIER_KEYWORDS: &[&str] = &[
    "play number",
    "play type",
    "play id",
    "sheet",
    "quarter",
    "qtr",
    "drive",
    "series",
    "hash",
    "formation",
    "personnel",
    "pers",
    "odk",
    "yard line",
    "field position",
    "opponent",
    "opp",
    "date",
    "week",
    "game",
    "name",
    "player",
    "jersey",
    "result",
];

static OFFENSIVE_PERCENTAGE_KEYWORDS: &[&str] = &[
    "pct",
    "percent",
    "percentage",
    "rate",
    "efficiency",
    "success rate",
    "conversion rate",
];

static DEFENSIVE_PERCENTAGE_KEYWORDS: &[&str] = &[
    "pct",
    "percent",
    "percentage",
    "rate",
    "stop rate",
    "havoc rate",
    "pressure rate",
];

static TOTAL_KEYWORDS: &[&str] = &["total", "totals", "sum", "cumulative", "season"];

static AVERAGE_KEYWORDS: &[&str] = &["avg", "average", "mean", "per", "ypc", "ypa", "ypp"];

static SITUATIONAL_KEYWORDS: &[&str] = &[
    "situational",
    "red zone",
    "redzone",
    "third down",
    "3rd down",
    "fourth down",
    "4th down",
    "goal line",
    "two minute",
    "2 minute",
    "short yardage",
    "backed up",
];

static ADVANCED_KEYWORDS: &[&str] = &[
    "epa",
    "wpa",
    "dvoa",
    "cpoe",
    "nee",
    "explosive",
    "negative",
    "efficient",
    "success",
    "yac",
    "air yards",
    "havoc",
];

static OFFENSIVE_BASIC_KEYWORDS: &[&str] = &[
    "yards",
    "yds",
    "yard",
    "gain",
    "gains",
    "carries",
    "carry",
    "rush",
    "rushes",
    "rushing",
    "pass",
    "passes",
    "passing",
    "completions",
    "completion",
    "comp",
    "attempts",
    "att",
    "touchdowns",
    "touchdown",
    "td",
    "tds",
    "first downs",
    "calls",
    "receptions",
    "targets",
    "scrambles",
    "sacks",
    "interceptions",
    "fumbles",
    "plays",
];

static DEFENSIVE_BASIC_KEYWORDS: &[&str] = &[
    "tackles",
    "tackle",
    "tkl",
    "tfl",
    "sacks",
    "sack",
    "interceptions",
    "int",
    "ints",
    "pbu",
    "pass breakups",
    "forced fumbles",
    "ff",
    "fumble recoveries",
    "pressures",
    "hurries",
    "qb hits",
    "yards allowed",
    "points allowed",
    "calls",
    "plays",
];

impl AnalysisMode {
    fn percentage_keywords(&self) -> &'static [&'static str] {
        match self {
            AnalysisMode::Offensive => OFFENSIVE_PERCENTAGE_KEYWORDS,
            AnalysisMode::Defensive => DEFENSIVE_PERCENTAGE_KEYWORDS,
        }
    }

    fn basic_keywords(&self) -> &'static [&'static str] {
        match self {
            AnalysisMode::Offensive => OFFENSIVE_BASIC_KEYWORDS,
            AnalysisMode::Defensive => DEFENSIVE_BASIC_KEYWORDS,
        }
    }
}

/// Splits a column name into lower-case words on anything non-alphanumeric.
fn words(name: &str) -> Vec<String> {
    name.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_string)
        .collect()
}

/// A keyword matches when all of its words appear contiguously in the name.
fn has_keyword(words: &[String], keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| {
        let needle: Vec<&str> = keyword.split(' ').collect();
        words
            .windows(needle.len())
            .any(|window| window.iter().zip(&needle).all(|(word, want)| word.as_str() == *want))
    })
}

/// Classifies one column name. Rules are tried in a fixed order and the first
/// match wins.
pub fn classify(name: &str, mode: AnalysisMode) -> ColumnCategory {
    let words = words(name);
    let whole = words.join(" ");

    if IDENTIFIER_NAMES.contains(&whole.as_str()) || has_keyword(&words, IDENTIFIER_KEYWORDS) {
        ColumnCategory::Identifier
    } else if name.trim_end().ends_with('%') || has_keyword(&words, mode.percentage_keywords()) {
        ColumnCategory::Percentage
    } else if has_keyword(&words, TOTAL_KEYWORDS) {
        ColumnCategory::Total
    } else if has_keyword(&words, AVERAGE_KEYWORDS) {
        ColumnCategory::Average
    } else if has_keyword(&words, SITUATIONAL_KEYWORDS) {
        ColumnCategory::Situational
    } else if has_keyword(&words, ADVANCED_KEYWORDS) {
        ColumnCategory::Advanced
    } else if has_keyword(&words, mode.basic_keywords()) {
        ColumnCategory::BasicStat
    } else {
        ColumnCategory::Unknown
    }
}

/// Every column of a table, bucketed by category. Order within a bucket follows
/// the order the columns were given in.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ColumnCatalog {
    pub mode: AnalysisMode,
    pub identifier: Vec<String>,
    pub basic_stat: Vec<String>,
    pub percentage: Vec<String>,
    pub total: Vec<String>,
    pub average: Vec<String>,
    pub situational: Vec<String>,
    pub advanced: Vec<String>,
    pub unknown: Vec<String>,
}

impl ColumnCatalog {
    pub fn classify<I, S>(names: I, mode: AnalysisMode) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut catalog = ColumnCatalog {
            mode,
            ..Default::default()
        };
        for name in names {
            let name = name.as_ref();
            catalog
                .bucket_mut(classify(name, mode))
                .push(name.to_string());
        }
        log::debug!(
            "Classified columns: {} identifier, {} basic, {} percentage, {} unknown",
            catalog.identifier.len(),
            catalog.basic_stat.len(),
            catalog.percentage.len(),
            catalog.unknown.len()
        );
        catalog
    }

    pub fn get(&self, category: ColumnCategory) -> &[String] {
        match category {
            ColumnCategory::Identifier => &self.identifier,
            ColumnCategory::BasicStat => &self.basic_stat,
            ColumnCategory::Percentage => &self.percentage,
            ColumnCategory::Total => &self.total,
            ColumnCategory::Average => &self.average,
            ColumnCategory::Situational => &self.situational,
            ColumnCategory::Advanced => &self.advanced,
            ColumnCategory::Unknown => &self.unknown,
        }
    }

    fn bucket_mut(&mut self, category: ColumnCategory) -> &mut Vec<String> {
        match category {
            ColumnCategory::Identifier => &mut self.identifier,
            ColumnCategory::BasicStat => &mut self.basic_stat,
            ColumnCategory::Percentage => &mut self.percentage,
            ColumnCategory::Total => &mut self.total,
            ColumnCategory::Average => &mut self.average,
            ColumnCategory::Situational => &mut self.situational,
            ColumnCategory::Advanced => &mut self.advanced,
            ColumnCategory::Unknown => &mut self.unknown,
        }
    }

    pub fn category_of(&self, name: &str) -> Option<ColumnCategory> {
        use ColumnCategory::*;
        [Identifier, BasicStat, Percentage, Total, Average, Situational, Advanced, Unknown]
            .into_iter()
            .find(|category| self.get(*category).iter().any(|column| column == name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offensive_examples() {
        let catalog = ColumnCatalog::classify(
            ["Down", "Completion %", "Total Yards", "Avg Gain"],
            AnalysisMode::Offensive,
        );
        assert_eq!(catalog.identifier, vec!["Down"]);
        assert_eq!(catalog.percentage, vec!["Completion %"]);
        assert_eq!(catalog.total, vec!["Total Yards"]);
        assert_eq!(catalog.average, vec!["Avg Gain"]);
        assert!(catalog.basic_stat.is_empty());
        assert!(catalog.unknown.is_empty());
    }

    #[test]
    fn first_matching_rule_wins() {
        // identifier beats percentage
        assert_eq!(classify("Play Type %", AnalysisMode::Offensive), ColumnCategory::Identifier);
        // percentage beats total
        assert_eq!(classify("Total Completion Pct", AnalysisMode::Offensive), ColumnCategory::Percentage);
        // total beats basic
        assert_eq!(classify("total_yards", AnalysisMode::Offensive), ColumnCategory::Total);
        // situational is reachable even with "down" in the name
        assert_eq!(classify("3rd Down Conversions", AnalysisMode::Offensive), ColumnCategory::Situational);
        assert_eq!(classify("explosive", AnalysisMode::Offensive), ColumnCategory::Advanced);
    }

    #[test]
    fn mode_selects_basic_vocabulary() {
        assert_eq!(classify("Tackles", AnalysisMode::Defensive), ColumnCategory::BasicStat);
        assert_eq!(classify("Tackles", AnalysisMode::Offensive), ColumnCategory::Unknown);
        assert_eq!(classify("Yards", AnalysisMode::Offensive), ColumnCategory::BasicStat);
        assert_eq!(classify("Yards", AnalysisMode::Defensive), ColumnCategory::Unknown);
        assert_eq!(classify("Yards Allowed", AnalysisMode::Defensive), ColumnCategory::BasicStat);
    }

    #[test]
    fn mode_selects_percentage_vocabulary() {
        assert_eq!(classify("efficiency", AnalysisMode::Offensive), ColumnCategory::Percentage);
        assert_eq!(classify("efficiency", AnalysisMode::Defensive), ColumnCategory::Unknown);
    }

    #[test]
    fn keywords_match_whole_words() {
        // "first downs" is not the identifier "down", and "inside" is not "id"
        assert_eq!(classify("First Downs", AnalysisMode::Offensive), ColumnCategory::BasicStat);
        assert_eq!(classify("inside zone", AnalysisMode::Offensive), ColumnCategory::Unknown);
    }

    #[test]
    fn every_column_lands_in_exactly_one_bucket() {
        let names = ["play", "yards", "completion_pct", "sheet_name", "mystery", "ypc"];
        let catalog = ColumnCatalog::classify(names, AnalysisMode::Offensive);
        for name in names {
            assert!(catalog.category_of(name).is_some(), "{} not classified", name);
        }
        let total: usize = [
            &catalog.identifier,
            &catalog.basic_stat,
            &catalog.percentage,
            &catalog.total,
            &catalog.average,
            &catalog.situational,
            &catalog.advanced,
            &catalog.unknown,
        ]
        .iter()
        .map(|bucket| bucket.len())
        .sum();
        assert_eq!(total, names.len());
        assert_eq!(catalog.category_of("mystery"), Some(ColumnCategory::Unknown));
    }

    #[test]
    fn mode_round_trips_through_text() {
        assert_eq!("defensive".parse::<AnalysisMode>().unwrap(), AnalysisMode::Defensive);
        assert_eq!(AnalysisMode::Offensive.to_string(), "offensive");
        assert_eq!(ColumnCategory::BasicStat.to_string(), "basic_stat");
    }
}
