use crate::{filter, normalize::normalize, sheet, Result, SHEET_ORDER};
use derive_deref::Deref;
use polars::prelude::*;
use serde::Serialize;
use serde_json::{Map, Number, Value};
use std::path::Path;

/// The unified play-by-play table for a set of selected sheets.
#[derive(Clone, Debug, Deref)]
pub struct PlayDf(DataFrame);

/// Row-level data in a JSON-safe shape: missing and non-finite values become
/// empty strings.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlayRows {
    pub columns: Vec<String>,
    pub rows: Vec<Map<String, Value>>,
}

impl PlayDf {
    pub fn new(df: DataFrame) -> Self {
        PlayDf(df)
    }

    /// Loads and normalizes the selected sheets of a workbook
    pub fn load<P: AsRef<Path>>(path: P, sheet_names: &[String]) -> Result<Self> {
        let plays = sheet::load_sheets(path, sheet_names)?;
        normalize(plays)
    }

    pub fn into_inner(self) -> DataFrame {
        self.0
    }

    pub fn filter(self, filter: Expr) -> Result<Self> {
        let df = self.0.lazy().filter(filter).collect()?;
        Ok(PlayDf(df))
    }

    pub fn filter_sql(self, query: &str) -> Result<Self> {
        let df = filter::filter_sql(self.0.lazy(), query)?.collect()?;
        Ok(PlayDf(df))
    }

    /// Rows ordered by sheet order, keeping row order within each sheet
    pub fn sorted_by_sheet(self) -> Result<Self> {
        let df = self
            .0
            .lazy()
            .sort([SHEET_ORDER], SortMultipleOptions::default().with_maintain_order(true))
            .collect()?;
        Ok(PlayDf(df))
    }

    pub fn numeric_columns(&self) -> Vec<String> {
        self.0
            .get_columns()
            .iter()
            .filter(|series| series.dtype().is_numeric())
            .map(|series| series.name().to_string())
            .collect()
    }

    pub fn has_numeric_column(&self, name: &str) -> bool {
        self.0
            .column(name)
            .map(|series| series.dtype().is_numeric())
            .unwrap_or(false)
    }

    pub fn to_rows(&self) -> Result<PlayRows> {
        self.head_rows(self.0.height())
    }

    pub fn head_rows(&self, limit: usize) -> Result<PlayRows> {
        let columns = self.0.get_columns();
        let height = self.0.height().min(limit);
        let mut rows = Vec::with_capacity(height);
        for idx in 0..height {
            let mut row = Map::new();
            for series in columns {
                row.insert(series.name().to_string(), json_value(series.get(idx)?));
            }
            rows.push(row);
        }
        Ok(PlayRows {
            columns: columns.iter().map(|series| series.name().to_string()).collect(),
            rows,
        })
    }
}

fn json_value(value: AnyValue) -> Value {
    match value {
        AnyValue::Null => Value::String(String::new()),
        AnyValue::Boolean(value) => Value::Bool(value),
        AnyValue::String(value) => Value::String(value.to_string()),
        AnyValue::Int32(value) => value.into(),
        AnyValue::Int64(value) => value.into(),
        AnyValue::UInt32(value) => value.into(),
        AnyValue::UInt64(value) => value.into(),
        AnyValue::Float32(value) => finite_number(value as f64),
        AnyValue::Float64(value) => finite_number(value),
        other => Value::String(other.to_string()),
    }
}

fn finite_number(value: f64) -> Value {
    Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(String::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{filter::PlayFilter, PlayType, PLAY, PLAY_TYPE, SHEET_NAME};

    fn plays() -> PlayDf {
        let df = df!(
            PLAY => &[1.0, 2.0, 1.0, 2.0],
            "yards" => &[Some(4.0), None, None, Some(12.0)],
            "result" => &[Some("Rush"), Some("Rush"), None, Some("Complete")],
            SHEET_NAME => &["Week3 Run", "Week3 Run", "Week1 Pass", "Week1 Pass"],
            SHEET_ORDER => &[0i64, 0, 1, 1],
            PLAY_TYPE => &["Run", "Run", "Pass", "Pass"],
        )
        .unwrap();
        PlayDf::new(df)
    }

    #[test]
    fn rows_are_json_safe() {
        let rows = plays().to_rows().unwrap();
        assert_eq!(rows.rows.len(), 4);
        assert_eq!(rows.rows[1]["yards"], Value::String(String::new()));
        assert_eq!(rows.rows[2]["yards"], Value::String(String::new()));
        assert_eq!(rows.rows[2]["result"], Value::String(String::new()));
        assert_eq!(rows.rows[0]["yards"], serde_json::json!(4.0));
        assert_eq!(rows.rows[0][SHEET_ORDER], serde_json::json!(0));
        assert!(serde_json::to_string(&rows).is_ok());
    }

    #[test]
    fn non_finite_numbers_become_empty() {
        assert_eq!(json_value(AnyValue::Float64(f64::NAN)), Value::String(String::new()));
        assert_eq!(json_value(AnyValue::Float64(f64::INFINITY)), Value::String(String::new()));
        assert_eq!(json_value(AnyValue::Float64(1.5)), serde_json::json!(1.5));
    }

    #[test]
    fn head_rows_limits_output() {
        let rows = plays().head_rows(2).unwrap();
        assert_eq!(rows.rows.len(), 2);
        assert_eq!(rows.columns[0], PLAY);
    }

    #[test]
    fn filters_by_play_type_and_play_number() {
        let filter = PlayFilter::new().play_type(PlayType::Pass).plays(&[2.0]).build();
        let filtered = plays().filter(filter).unwrap();
        assert_eq!(filtered.height(), 1);
        let yards = filtered.column("yards").unwrap().f64().unwrap().get(0);
        assert_eq!(yards, Some(12.0));
    }

    #[test]
    fn empty_play_list_matches_nothing() {
        let filtered = plays().filter(PlayFilter::new().plays(&[]).build()).unwrap();
        assert_eq!(filtered.height(), 0);
    }

    #[test]
    fn filters_with_sql() {
        let filtered = plays()
            .filter_sql("SELECT * FROM plays WHERE yards > 5")
            .unwrap();
        assert_eq!(filtered.height(), 1);
    }

    #[test]
    fn numeric_columns() {
        let plays = plays();
        assert_eq!(plays.numeric_columns(), vec![PLAY, "yards", SHEET_ORDER]);
        assert!(plays.has_numeric_column("yards"));
        assert!(!plays.has_numeric_column("result"));
        assert!(!plays.has_numeric_column("missing"));
    }
}
