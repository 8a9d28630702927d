use crate::{
    metric::{Computation, MetricSpec},
    plays::PlayDf,
    Result, SHEET_NAME, SHEET_ORDER,
};
use polars::prelude::*;
use serde::Serialize;
use std::ops::Deref;

/// One aggregated value for one sheet. `value` is `None` when undefined, e.g.
/// a ratio over a zero denominator.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SheetValue {
    pub sheet_name: String,
    pub sheet_order: i64,
    pub value: Option<f64>,
}

/// A metric computed per sheet, in sheet order
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MetricSeries {
    pub metric: String,
    pub display_name: String,
    pub rows: Vec<SheetValue>,
}

impl MetricSeries {
    pub fn sheet_names(&self) -> Vec<String> {
        self.rows.iter().map(|row| row.sheet_name.clone()).collect()
    }

    pub fn values(&self) -> Vec<Option<f64>> {
        self.rows.iter().map(|row| row.value).collect()
    }
}

/// Computes `metric` for every sheet in the table.
///
/// Rows come back ordered by `sheet_order`, which is the order the user picked
/// the sheets in. If the metric reads a column the table doesn't have, the
/// result is the per-sheet play count instead.
pub fn aggregate(plays: &PlayDf, metric: &MetricSpec) -> Result<MetricSeries> {
    log::trace!("aggregate::aggregate {}", metric.name);

    let missing: Vec<&str> = metric
        .inputs()
        .into_iter()
        .filter(|column| !plays.has_numeric_column(column))
        .collect();
    let fallback;
    let metric = if missing.is_empty() {
        metric
    } else {
        log::warn!(
            "Metric '{}' needs missing column(s) {}; counting plays instead",
            metric.name,
            missing.join(", ")
        );
        fallback = MetricSpec::count();
        &fallback
    };

    let rows = match &metric.computation {
        Computation::Count => {
            let df = per_sheet(plays, [col(SHEET_NAME).count().cast(DataType::Float64).alias("value")])?;
            sheet_values(&df, column_values(&df, "value")?)?
        }
        Computation::Sum { column } => {
            let df = per_sheet(plays, [col(column).cast(DataType::Float64).sum().alias("value")])?;
            sheet_values(&df, column_values(&df, "value")?)?
        }
        Computation::Mean { column } => {
            let df = per_sheet(plays, [col(column).cast(DataType::Float64).mean().alias("value")])?;
            sheet_values(&df, column_values(&df, "value")?)?
        }
        Computation::Ratio {
            numerator,
            denominator,
            scale,
            rescale_fractions,
        } => {
            let df = per_sheet(
                plays,
                [
                    col(numerator).cast(DataType::Float64).sum().alias("ratio_numerator"),
                    col(denominator).cast(DataType::Float64).sum().alias("ratio_denominator"),
                ],
            )?;
            let ratios = ratio_values(
                column_values(&df, "ratio_numerator")?,
                column_values(&df, "ratio_denominator")?,
                *scale,
            );
            let ratios = if *rescale_fractions {
                rescale_if_fractional(ratios)
            } else {
                ratios
            };
            sheet_values(&df, ratios)?
        }
    };

    log::debug!("{}: {} sheets", metric.name, rows.len());
    Ok(MetricSeries {
        metric: metric.name.clone(),
        display_name: metric.display_name.clone(),
        rows,
    })
}

/// Groups by sheet and sorts by the sheet's selection order
fn per_sheet<E: AsRef<[Expr]>>(plays: &PlayDf, aggs: E) -> Result<DataFrame> {
    let df = plays
        .deref()
        .clone()
        .lazy()
        .group_by([col(SHEET_NAME), col(SHEET_ORDER)])
        .agg(aggs)
        .sort([SHEET_ORDER], SortMultipleOptions::default())
        .collect()?;
    Ok(df)
}

fn column_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let values = df.column(name)?.cast(&DataType::Float64)?;
    let values = values
        .f64()?
        .into_iter()
        .map(|value| value.filter(|value| value.is_finite()))
        .collect();
    Ok(values)
}

fn sheet_values(df: &DataFrame, values: Vec<Option<f64>>) -> Result<Vec<SheetValue>> {
    let names = df.column(SHEET_NAME)?.cast(&DataType::String)?;
    let orders = df.column(SHEET_ORDER)?.cast(&DataType::Int64)?;
    let rows = names
        .str()?
        .into_iter()
        .zip(orders.i64()?)
        .zip(values)
        .map(|((name, order), value)| SheetValue {
            sheet_name: name.unwrap_or_default().to_string(),
            sheet_order: order.unwrap_or_default(),
            value,
        })
        .collect();
    Ok(rows)
}

/// Per-sheet `numerator / denominator * scale`; a zero or missing denominator
/// gives `None`.
pub fn ratio_values(
    numerators: Vec<Option<f64>>,
    denominators: Vec<Option<f64>>,
    scale: f64,
) -> Vec<Option<f64>> {
    numerators
        .into_iter()
        .zip(denominators)
        .map(|(numerator, denominator)| match (numerator, denominator) {
            (Some(numerator), Some(denominator)) if denominator != 0.0 => {
                Some(numerator / denominator * scale)
            }
            _ => None,
        })
        .collect()
}

/// Multiplies the whole series by 100 when its largest value is at most 1.0,
/// i.e. when it looks like fractions rather than whole percentages.
///
/// A genuinely tiny percentage (say 0.8%) is indistinguishable from a fraction
/// here and will be scaled up too.
pub fn rescale_if_fractional(values: Vec<Option<f64>>) -> Vec<Option<f64>> {
    let max = values.iter().flatten().copied().reduce(f64::max);
    match max {
        Some(max) if max <= 1.0 => values
            .into_iter()
            .map(|value| value.map(|value| value * 100.0))
            .collect(),
        _ => values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{catalog::AnalysisMode, PLAY};

    fn plays() -> PlayDf {
        // Sheets were selected as Week3, Week1, Week2
        let df = df!(
            PLAY => &[1.0, 2.0, 1.0, 2.0, 3.0, 1.0],
            "calls" => &[1.0, 1.0, 1.0, 1.0, 1.0, 0.0],
            "explosive" => &[1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            "yards" => &[Some(22.0), Some(3.0), Some(1.0), None, Some(15.0), Some(0.0)],
            "completions" => &[1.0, 1.0, 0.0, 1.0, 1.0, 0.0],
            "attempts" => &[1.0, 1.0, 1.0, 1.0, 2.0, 0.0],
            SHEET_NAME => &["Week3", "Week3", "Week1", "Week1", "Week1", "Week2"],
            SHEET_ORDER => &[0i64, 0, 1, 1, 1, 2],
        )
        .unwrap();
        PlayDf::new(df)
    }

    fn resolve(metric: &str) -> MetricSpec {
        MetricSpec::resolve(&plays(), Some(metric), AnalysisMode::Offensive)
    }

    #[test]
    fn keeps_selection_order_not_name_order() {
        let series = aggregate(&plays(), &MetricSpec::count()).unwrap();
        assert_eq!(series.sheet_names(), vec!["Week3", "Week1", "Week2"]);
        assert_eq!(series.values(), vec![Some(2.0), Some(3.0), Some(1.0)]);
        let orders: Vec<i64> = series.rows.iter().map(|row| row.sheet_order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
    }

    #[test]
    fn sums_a_plain_column() {
        let series = aggregate(&plays(), &resolve("yards")).unwrap();
        assert_eq!(series.metric, "yards");
        assert_eq!(series.values(), vec![Some(25.0), Some(16.0), Some(0.0)]);
    }

    #[test]
    fn mean_of_a_column() {
        let spec = MetricSpec {
            name: "yards".into(),
            display_name: "Yards".into(),
            computation: Computation::Mean { column: "yards".into() },
        };
        let series = aggregate(&plays(), &spec).unwrap();
        assert_eq!(series.values(), vec![Some(12.5), Some(8.0), Some(0.0)]);
    }

    #[test]
    fn rate_over_calls_is_a_whole_percentage() {
        let series = aggregate(&plays(), &resolve("explosive_rate")).unwrap();
        assert_eq!(series.display_name, "Explosive Rate");
        let values = series.values();
        assert_eq!(values[0], Some(50.0));
        assert!((values[1].unwrap() - 100.0 / 3.0).abs() < 1e-9);
        // Week2 has zero calls
        assert_eq!(values[2], None);
    }

    #[test]
    fn fractional_ratio_is_rescaled() {
        let series = aggregate(&plays(), &resolve("completion_pct")).unwrap();
        let values = series.values();
        assert_eq!(values[0], Some(100.0));
        assert!((values[1].unwrap() - 50.0).abs() < 1e-9);
        assert_eq!(values[2], None);
    }

    #[test]
    fn derived_average_is_not_scaled() {
        let series = aggregate(&plays(), &resolve("avg_yards_per_call")).unwrap();
        assert_eq!(series.values(), vec![Some(12.5), Some(16.0 / 3.0), None]);
    }

    #[test]
    fn missing_column_falls_back_to_count() {
        let spec = MetricSpec {
            name: "air_yards".into(),
            display_name: "Air Yards".into(),
            computation: Computation::Sum { column: "air_yards".into() },
        };
        let series = aggregate(&plays(), &spec).unwrap();
        assert_eq!(series.metric, "count");
        assert_eq!(series.values(), vec![Some(2.0), Some(3.0), Some(1.0)]);

        let series = aggregate(&plays(), &resolve("no_such_metric")).unwrap();
        assert_eq!(series.metric, "count");
    }

    #[test]
    fn rescales_only_fraction_looking_series() {
        assert_eq!(
            rescale_if_fractional(vec![Some(0.4), Some(0.6)]),
            vec![Some(40.0), Some(60.0)]
        );
        assert_eq!(
            rescale_if_fractional(vec![Some(40.0), Some(60.0)]),
            vec![Some(40.0), Some(60.0)]
        );
        assert_eq!(
            rescale_if_fractional(vec![Some(0.5), None]),
            vec![Some(50.0), None]
        );
        assert_eq!(rescale_if_fractional(vec![None, None]), vec![None, None]);
    }

    #[test]
    fn zero_denominator_is_none() {
        let ratios = ratio_values(vec![Some(3.0), Some(0.0), Some(1.0)], vec![Some(0.0), Some(0.0), None], 100.0);
        assert_eq!(ratios, vec![None, None, None]);
        let series = MetricSeries {
            metric: "m".into(),
            display_name: "M".into(),
            rows: vec![SheetValue {
                sheet_name: "Week1".into(),
                sheet_order: 0,
                value: ratios[0],
            }],
        };
        assert_eq!(
            serde_json::to_string(&series.rows[0]).unwrap(),
            r#"{"sheet_name":"Week1","sheet_order":0,"value":null}"#
        );
    }
}
