use crate::{
    aggregate::aggregate,
    catalog::{AnalysisMode, ColumnCatalog, ColumnCategory},
    chart::{bar_chart, ChartSpec},
    metric::{available_metrics, suggest_calculations, MetricSpec, Suggestion},
    plays::PlayDf,
    PlayType, Result, PLAY_TYPE, SHEET_ORDER,
};
use polars::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SheetSummary {
    pub name: String,
    pub order: i64,
    pub plays: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PlayTypeCounts {
    pub run: usize,
    pub pass: usize,
    pub unknown: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ColumnStats {
    pub column: String,
    pub count: usize,
    pub total: f64,
    pub mean: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Summary {
    pub total_plays: usize,
    pub sheets: Vec<SheetSummary>,
    pub play_types: PlayTypeCounts,
    pub columns: Vec<ColumnStats>,
}

/// Everything the analyze view needs for one set of selected sheets
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Analysis {
    pub summary: Summary,
    pub columns: Vec<(String, String)>,
    pub catalog: ColumnCatalog,
    pub suggestions: Vec<Suggestion>,
    pub chart: ChartSpec,
    pub total_plays: usize,
}

pub fn analyze(plays: &PlayDf, mode: AnalysisMode) -> Result<Analysis> {
    log::trace!("summary::analyze");
    let summary = summarize(plays, mode)?;
    let catalog = ColumnCatalog::classify(plays.get_column_names(), mode);
    let suggestions = suggest_calculations(&catalog);
    let chart = bar_chart(&aggregate(plays, &MetricSpec::count())?);

    Ok(Analysis {
        total_plays: summary.total_plays,
        columns: available_metrics(plays, mode),
        summary,
        catalog,
        suggestions,
        chart,
    })
}

pub fn summarize(plays: &PlayDf, mode: AnalysisMode) -> Result<Summary> {
    let counts = aggregate(plays, &MetricSpec::count())?;
    let sheets = counts
        .rows
        .into_iter()
        .map(|row| SheetSummary {
            name: row.sheet_name,
            order: row.sheet_order,
            plays: row.value.unwrap_or_default() as usize,
        })
        .collect();

    let columns = plays
        .numeric_columns()
        .into_iter()
        .filter(|column| column != SHEET_ORDER)
        .filter(|column| crate::catalog::classify(column, mode) != ColumnCategory::Identifier)
        .map(|column| column_stats(plays, &column))
        .collect::<Result<Vec<_>>>()?;

    Ok(Summary {
        total_plays: plays.height(),
        sheets,
        play_types: play_type_counts(plays)?,
        columns,
    })
}

fn play_type_counts(plays: &PlayDf) -> Result<PlayTypeCounts> {
    let mut counts = PlayTypeCounts::default();
    let Ok(play_types) = plays.column(PLAY_TYPE) else {
        counts.unknown = plays.height();
        return Ok(counts);
    };
    for play_type in play_types.str()? {
        match play_type.and_then(|value| value.parse::<PlayType>().ok()) {
            Some(PlayType::Run) => counts.run += 1,
            Some(PlayType::Pass) => counts.pass += 1,
            _ => counts.unknown += 1,
        }
    }
    Ok(counts)
}

fn column_stats(plays: &PlayDf, column: &str) -> Result<ColumnStats> {
    let series = plays.column(column)?.cast(&DataType::Float64)?;
    let values: Vec<f64> = series
        .f64()?
        .into_iter()
        .flatten()
        .filter(|value| value.is_finite())
        .collect();
    let total: f64 = values.iter().sum();
    let mean = (!values.is_empty()).then(|| total / values.len() as f64);
    Ok(ColumnStats {
        column: column.to_string(),
        count: values.len(),
        total,
        mean,
        min: values.iter().copied().reduce(f64::min),
        max: values.iter().copied().reduce(f64::max),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PLAY, SHEET_NAME};

    fn plays() -> PlayDf {
        let df = df!(
            PLAY => &[1.0, 2.0, 1.0],
            "down" => &[1.0, 2.0, 1.0],
            "yards" => &[Some(4.0), None, Some(-2.0)],
            "calls" => &[1.0, 1.0, 1.0],
            SHEET_NAME => &["Week2 Run", "Week2 Run", "Week1 Pass"],
            SHEET_ORDER => &[0i64, 0, 1],
            PLAY_TYPE => &["Run", "Run", "Pass"],
        )
        .unwrap();
        PlayDf::new(df)
    }

    #[test]
    fn summarizes_sheets_and_play_types() {
        let summary = summarize(&plays(), AnalysisMode::Offensive).unwrap();
        assert_eq!(summary.total_plays, 3);
        assert_eq!(
            summary.sheets,
            vec![
                SheetSummary { name: "Week2 Run".into(), order: 0, plays: 2 },
                SheetSummary { name: "Week1 Pass".into(), order: 1, plays: 1 },
            ]
        );
        assert_eq!(summary.play_types, PlayTypeCounts { run: 2, pass: 1, unknown: 0 });
    }

    #[test]
    fn numeric_stats_skip_identifiers_and_nulls() {
        let summary = summarize(&plays(), AnalysisMode::Offensive).unwrap();
        let names: Vec<&str> = summary.columns.iter().map(|c| c.column.as_str()).collect();
        assert_eq!(names, vec!["yards", "calls"]);
        let yards = &summary.columns[0];
        assert_eq!(yards.count, 2);
        assert_eq!(yards.total, 2.0);
        assert_eq!(yards.mean, Some(1.0));
        assert_eq!(yards.min, Some(-2.0));
        assert_eq!(yards.max, Some(4.0));
    }

    #[test]
    fn analysis_bundles_chart_and_columns() {
        let analysis = analyze(&plays(), AnalysisMode::Offensive).unwrap();
        assert_eq!(analysis.total_plays, 3);
        assert_eq!(analysis.chart.title, "Play Count");
        assert_eq!(
            analysis.chart.encoding.x.sort,
            Some(vec!["Week2 Run".to_string(), "Week1 Pass".to_string()])
        );
        assert_eq!(analysis.columns[0], ("avg_yards_per_call".to_string(), "Average Yards per Call".to_string()));
        assert_eq!(analysis.catalog.identifier, vec![PLAY, "down", SHEET_NAME, SHEET_ORDER, PLAY_TYPE]);
        assert!(serde_json::to_string(&analysis).is_ok());
    }
}
