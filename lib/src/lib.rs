use parse_display::{Display, FromStr};

mod error;
pub mod aggregate;
pub mod catalog;
pub mod chart;
pub mod filter;
pub mod metric;
pub mod normalize;
pub mod plays;
pub mod sheet;
pub mod summary;
#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

pub use catalog::{AnalysisMode, ColumnCatalog, ColumnCategory};
pub use error::Error;
pub use metric::MetricSpec;
pub use plays::PlayDf;

pub type Result<T> = std::result::Result<T, error::Error>;

// Columns injected by the sheet loader, before normalization
pub const RAW_SHEET_NAME: &str = "SheetName";
pub const RAW_SHEET_ORDER: &str = "SheetOrder";

// Canonical column names after normalization
pub const SHEET_NAME: &str = "sheet_name";
pub const SHEET_ORDER: &str = "sheet_order";
pub const PLAY: &str = "play";
pub const PLAY_TYPE: &str = "inferred_play_type";

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Display, FromStr)]
pub enum PlayType {
    Run,
    Pass,
    Unknown,
}

impl PlayType {
    /// Sheets are conventionally named after the play family they chart,
    /// e.g. "Week 3 Run Game" or "Pass - Opp B".
    pub fn from_sheet_name(sheet_name: &str) -> Self {
        let name = sheet_name.trim().to_lowercase();
        if name.contains("run") {
            PlayType::Run
        } else if name.contains("pass") {
            PlayType::Pass
        } else {
            PlayType::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlayType::Run => "Run",
            PlayType::Pass => "Pass",
            PlayType::Unknown => "Unknown",
        }
    }
}

/// Turns a raw column name into something fit for a label: `avg_gain` -> `Avg Gain`
pub fn display_name(column: &str) -> String {
    column
        .split(|c: char| c == '_' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn play_type_from_sheet_name() {
        assert_eq!(PlayType::from_sheet_name("Week 1 Run Game"), PlayType::Run);
        assert_eq!(PlayType::from_sheet_name("  PASS  "), PlayType::Pass);
        assert_eq!(PlayType::from_sheet_name("Week 2"), PlayType::Unknown);
    }

    #[test]
    fn display_names() {
        assert_eq!(display_name("avg_gain"), "Avg Gain");
        assert_eq!(display_name("completion_pct"), "Completion Pct");
        assert_eq!(display_name("yards"), "Yards");
    }
}
