//! Vega-Lite bar chart specs for per-sheet metrics.

use crate::{
    aggregate::{aggregate, MetricSeries, SheetValue},
    catalog::AnalysisMode,
    metric::MetricSpec,
    plays::PlayDf,
    Result, SHEET_NAME,
};
use serde::Serialize;

pub const VEGA_LITE_SCHEMA: &str = "https://vega.github.io/schema/vega-lite/v5.json";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChartSpec {
    #[serde(rename = "$schema")]
    pub schema: String,
    pub title: String,
    pub width: String,
    pub mark: Mark,
    pub data: InlineData,
    pub encoding: Encoding,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Mark {
    #[serde(rename = "type")]
    pub kind: String,
    pub tooltip: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct InlineData {
    pub values: Vec<SheetValue>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Encoding {
    pub x: FieldEncoding,
    pub y: FieldEncoding,
    pub tooltip: Vec<FieldEncoding>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Nominal,
    Quantitative,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldEncoding {
    pub field: String,
    #[serde(rename = "type")]
    pub kind: FieldType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Explicit category order; the charting layer sorts alphabetically otherwise
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl FieldEncoding {
    fn new(field: &str, kind: FieldType, title: &str) -> Self {
        FieldEncoding {
            field: field.to_string(),
            kind,
            title: Some(title.to_string()),
            sort: None,
            format: None,
        }
    }
}

/// Bar chart with one bar per sheet, in sheet order
pub fn bar_chart(series: &MetricSeries) -> ChartSpec {
    let mut x = FieldEncoding::new(SHEET_NAME, FieldType::Nominal, "Sheet");
    x.sort = Some(series.sheet_names());
    let y = FieldEncoding::new("value", FieldType::Quantitative, &series.display_name);

    let mut value_tooltip = y.clone();
    value_tooltip.format = Some(",.2f".to_string());
    let tooltip = vec![FieldEncoding::new(SHEET_NAME, FieldType::Nominal, "Sheet"), value_tooltip];

    ChartSpec {
        schema: VEGA_LITE_SCHEMA.to_string(),
        title: series.display_name.clone(),
        width: "container".to_string(),
        mark: Mark {
            kind: "bar".to_string(),
            tooltip: true,
        },
        data: InlineData {
            values: series.rows.clone(),
        },
        encoding: Encoding { x, y, tooltip },
    }
}

/// Resolves the requested metric, aggregates it per sheet, and charts it.
/// Unknown metrics chart the play count per sheet.
pub fn compare(plays: &PlayDf, requested: Option<&str>, mode: AnalysisMode) -> Result<ChartSpec> {
    let metric = MetricSpec::resolve(plays, requested, mode);
    let series = aggregate(plays, &metric)?;
    Ok(bar_chart(&series))
}
