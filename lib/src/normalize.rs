//! Column normalization: canonical names, numeric coercion, and play-type inference.

use crate::{plays::PlayDf, PlayType, Result, PLAY, PLAY_TYPE, SHEET_NAME};
use polars::prelude::*;

/// Exact (case-insensitive) renames applied after lower-casing
static SYNONYMS: &[(&str, &str)] = &[
    ("situational efficiency", "situational_efficiency"),
    ("completion %", "completion_pct"),
    ("comp %", "completion_pct"),
    ("yards per carry", "yards_per_carry"),
    ("first downs", "first_downs"),
    ("sheetname", SHEET_NAME),
    ("sheetorder", "sheet_order"),
    ("inferredplaytype", PLAY_TYPE),
];

// Identifier columns that must keep their text values
static PROTECTED: &[&str] = &[PLAY, SHEET_NAME];

/// Normalizes a freshly loaded play table.
///
/// Running this on an already normalized table returns the same table.
pub fn normalize(plays: PlayDf) -> Result<PlayDf> {
    log::trace!("normalize::normalize");
    let df = plays.into_inner();
    let play_types = infer_play_types(&df)?;

    let mut columns: Vec<Series> = Vec::with_capacity(df.width() + 1);
    for series in df.get_columns() {
        let name = canonical_name(series.name());
        // Always re-derived from the sheet name below
        if name == PLAY_TYPE {
            continue;
        }
        let mut series = series.clone();
        series.rename(&name);
        push_or_coalesce(&mut columns, series)?;
    }

    let mut columns = columns
        .into_iter()
        .map(|series| {
            if PROTECTED.contains(&series.name()) {
                Ok(series)
            } else {
                coerce_numeric(&series)
            }
        })
        .collect::<Result<Vec<_>>>()?;

    match play_types {
        Some(play_types) => columns.push(play_types),
        None => log::debug!("No sheet name column; skipping play type inference"),
    }

    let df = DataFrame::new(columns)?;
    log::debug!("Normalized {} columns", df.width());
    Ok(PlayDf::new(df))
}

/// Lower-cased, trimmed, and mapped through the synonym table
pub fn canonical_name(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    SYNONYMS
        .iter()
        .find(|(from, _)| *from == lowered)
        .map(|(_, to)| to.to_string())
        .unwrap_or(lowered)
}

/// Converts a text column to Float64 when at least one non-empty value parses
/// as a number. Values that don't parse become null. Other columns are returned
/// unchanged.
pub fn coerce_numeric(series: &Series) -> Result<Series> {
    if series.dtype() != &DataType::String {
        return Ok(series.clone());
    }
    let parsed: Vec<Option<f64>> = series
        .str()?
        .into_iter()
        .map(|value| value.and_then(parse_number))
        .collect();
    if parsed.iter().all(Option::is_none) {
        log::trace!("Column '{}' stays text", series.name());
        return Ok(series.clone());
    }
    Ok(Series::new(series.name(), parsed))
}

pub(crate) fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|value| value.is_finite())
}

fn infer_play_types(df: &DataFrame) -> Result<Option<Series>> {
    let Some(sheet_names) = df
        .get_columns()
        .iter()
        .find(|series| canonical_name(series.name()) == SHEET_NAME)
    else {
        return Ok(None);
    };
    let sheet_names = sheet_names.cast(&DataType::String)?;
    let play_types: Vec<&str> = sheet_names
        .str()?
        .into_iter()
        .map(|name| PlayType::from_sheet_name(name.unwrap_or_default()).as_str())
        .collect();
    Ok(Some(Series::new(PLAY_TYPE, play_types)))
}

/// Columns that collapse onto the same canonical name are merged, earliest
/// column first.
fn push_or_coalesce(columns: &mut Vec<Series>, series: Series) -> Result<()> {
    match columns.iter_mut().find(|existing| existing.name() == series.name()) {
        Some(existing) => {
            log::debug!("Merging duplicate column '{}'", series.name());
            *existing = coalesce(existing, &series)?;
        }
        None => columns.push(series),
    }
    Ok(())
}

fn coalesce(first: &Series, second: &Series) -> Result<Series> {
    if first.dtype() == &DataType::Float64 && second.dtype() == &DataType::Float64 {
        let values: Vec<Option<f64>> = first
            .f64()?
            .into_iter()
            .zip(second.f64()?)
            .map(|(a, b)| a.or(b))
            .collect();
        return Ok(Series::new(first.name(), values));
    }
    let first_text = first.cast(&DataType::String)?;
    let second_text = second.cast(&DataType::String)?;
    let values: Vec<Option<&str>> = first_text
        .str()?
        .into_iter()
        .zip(second_text.str()?)
        .map(|(a, b)| a.or(b))
        .collect();
    Ok(Series::new(first.name(), values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RAW_SHEET_NAME, RAW_SHEET_ORDER, SHEET_ORDER};

    fn raw_plays() -> PlayDf {
        let df = df!(
            "Play" => &["1", "2", "3", "4"],
            "Yards " => &[Some("10"), Some("n/a"), Some("7"), None],
            "Completion %" => &[0.5, 0.25, 1.0, 0.0],
            "Result" => &["Rush", "Pass", "Rush", "Sack"],
            RAW_SHEET_NAME => &["Week1 Run", "Week1 Run", "Week2 Pass", "Week3"],
            RAW_SHEET_ORDER => &[0i64, 0, 1, 2],
        )
        .unwrap();
        PlayDf::new(df)
    }

    #[test]
    fn coerces_partially_numeric_text() {
        let plays = normalize(raw_plays()).unwrap();
        let yards: Vec<Option<f64>> = plays.column("yards").unwrap().f64().unwrap().into_iter().collect();
        assert_eq!(yards, vec![Some(10.0), None, Some(7.0), None]);
    }

    #[test]
    fn leaves_protected_and_text_columns_alone() {
        let plays = normalize(raw_plays()).unwrap();
        assert_eq!(plays.column(PLAY).unwrap().dtype(), &DataType::String);
        assert_eq!(plays.column("result").unwrap().dtype(), &DataType::String);
        assert_eq!(plays.column(SHEET_ORDER).unwrap().dtype(), &DataType::Int64);
    }

    #[test]
    fn renames_to_canonical_names() {
        let plays = normalize(raw_plays()).unwrap();
        assert_eq!(
            plays.get_column_names(),
            vec![PLAY, "yards", "completion_pct", "result", SHEET_NAME, SHEET_ORDER, PLAY_TYPE]
        );
    }

    #[test]
    fn infers_play_type_from_sheet_name() {
        let plays = normalize(raw_plays()).unwrap();
        let play_types: Vec<&str> = plays.column(PLAY_TYPE).unwrap().str().unwrap().into_no_null_iter().collect();
        assert_eq!(play_types, vec!["Run", "Run", "Pass", "Unknown"]);
    }

    #[test]
    fn normalize_is_idempotent() {
        let once = normalize(raw_plays()).unwrap();
        let twice = normalize(once.clone()).unwrap();
        assert!(once.equals_missing(&twice));
    }

    #[test]
    fn merges_columns_that_share_a_canonical_name() {
        let df = df!(
            "Yards" => &[Some(3.0), None],
            "yards" => &[None, Some(8.0)],
            RAW_SHEET_NAME => &["Week1", "Week2"],
        )
        .unwrap();
        let plays = normalize(PlayDf::new(df)).unwrap();
        assert_eq!(plays.width(), 3);
        let yards: Vec<Option<f64>> = plays.column("yards").unwrap().f64().unwrap().into_iter().collect();
        assert_eq!(yards, vec![Some(3.0), Some(8.0)]);
    }

    #[test]
    fn text_column_without_numbers_is_not_coerced() {
        let series = Series::new("formation", &["Trips", "Empty", ""]);
        let coerced = coerce_numeric(&series).unwrap();
        assert_eq!(coerced.dtype(), &DataType::String);
    }

    #[test]
    fn parse_number_rejects_non_finite_text() {
        assert_eq!(parse_number(" 12.5 "), Some(12.5));
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number(""), None);
    }

    #[test]
    fn canonical_names() {
        assert_eq!(canonical_name(" Completion % "), "completion_pct");
        assert_eq!(canonical_name("Situational Efficiency"), "situational_efficiency");
        assert_eq!(canonical_name("SheetName"), SHEET_NAME);
        assert_eq!(canonical_name("Total Yards"), "total yards");
    }
}
