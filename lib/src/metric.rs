//! Comparison metrics: what to compute per sheet for a requested metric name.

use crate::{
    catalog::{classify, AnalysisMode, ColumnCatalog, ColumnCategory},
    display_name,
    plays::PlayDf,
    SHEET_ORDER,
};
use itertools::Itertools;
use serde::Serialize;

pub const COUNT: &str = "count";

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Computation {
    /// Rows per sheet
    Count,
    Sum { column: String },
    Mean { column: String },
    /// `sum(numerator) / sum(denominator) * scale`
    Ratio {
        numerator: String,
        denominator: String,
        scale: f64,
        rescale_fractions: bool,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MetricSpec {
    pub name: String,
    pub display_name: String,
    pub computation: Computation,
}

/// A percentage metric computed from two columns
pub(crate) struct RegisteredMetric {
    pub name: &'static str,
    pub display_name: &'static str,
    pub numerator: &'static str,
    pub denominator: &'static str,
    pub scale: f64,
    pub rescale_fractions: bool,
}

// Rates over `calls` are always scaled to whole percentages. Metrics over other
// denominators arrive pre-multiplied in some exports and as fractions in others.
pub(crate) static REGISTRY: &[RegisteredMetric] = &[
    RegisteredMetric {
        name: "efficiency_rate",
        display_name: "Efficiency Rate",
        numerator: "efficient",
        denominator: "calls",
        scale: 100.0,
        rescale_fractions: false,
    },
    RegisteredMetric {
        name: "explosive_rate",
        display_name: "Explosive Rate",
        numerator: "explosive",
        denominator: "calls",
        scale: 100.0,
        rescale_fractions: false,
    },
    RegisteredMetric {
        name: "negative_rate",
        display_name: "Negative Rate",
        numerator: "negative",
        denominator: "calls",
        scale: 100.0,
        rescale_fractions: false,
    },
    RegisteredMetric {
        name: "completion_pct",
        display_name: "Completion %",
        numerator: "completions",
        denominator: "attempts",
        scale: 1.0,
        rescale_fractions: true,
    },
    RegisteredMetric {
        name: "situational_efficiency",
        display_name: "Situational Efficiency",
        numerator: "situational_success",
        denominator: "situational_attempts",
        scale: 1.0,
        rescale_fractions: true,
    },
    // Derived only; offered when `calls` and the yardage column both exist
    RegisteredMetric {
        name: "avg_yards_per_call",
        display_name: "Average Yards per Call",
        numerator: "yards",
        denominator: "calls",
        scale: 1.0,
        rescale_fractions: false,
    },
    RegisteredMetric {
        name: "scramble_rate",
        display_name: "Scramble Rate",
        numerator: "scrambles",
        denominator: "calls",
        scale: 100.0,
        rescale_fractions: false,
    },
];

impl RegisteredMetric {
    fn is_available(&self, plays: &PlayDf) -> bool {
        plays.has_numeric_column(self.numerator) && plays.has_numeric_column(self.denominator)
    }

    fn spec(&self) -> MetricSpec {
        MetricSpec {
            name: self.name.to_string(),
            display_name: self.display_name.to_string(),
            computation: Computation::Ratio {
                numerator: self.numerator.to_string(),
                denominator: self.denominator.to_string(),
                scale: self.scale,
                rescale_fractions: self.rescale_fractions,
            },
        }
    }
}

impl MetricSpec {
    pub fn count() -> Self {
        MetricSpec {
            name: COUNT.to_string(),
            display_name: "Play Count".to_string(),
            computation: Computation::Count,
        }
    }

    /// Picks the computation for a requested metric name.
    ///
    /// Registered percentage metrics win when both of their inputs are present.
    /// Otherwise a numeric column of that name is summed, or averaged when it
    /// already holds a percentage or an average. Anything else falls back to
    /// counting plays.
    pub fn resolve(plays: &PlayDf, requested: Option<&str>, mode: AnalysisMode) -> Self {
        let Some(requested) = requested
            .map(str::trim)
            .filter(|name| !name.is_empty() && !name.eq_ignore_ascii_case(COUNT))
        else {
            return Self::count();
        };
        let key = requested.to_lowercase();

        if let Some(metric) = REGISTRY.iter().find(|metric| metric.name == key) {
            if metric.is_available(plays) {
                return metric.spec();
            }
            log::debug!(
                "Inputs for '{}' missing ({} / {}); trying a column of that name",
                metric.name,
                metric.numerator,
                metric.denominator
            );
        }

        if plays.has_numeric_column(&key) {
            let computation = match classify(&key, mode) {
                ColumnCategory::Percentage | ColumnCategory::Average => {
                    Computation::Mean { column: key.clone() }
                }
                _ => Computation::Sum { column: key.clone() },
            };
            return MetricSpec {
                display_name: display_name(&key),
                name: key,
                computation,
            };
        }

        log::warn!("Metric '{}' not found; falling back to play count", requested);
        Self::count()
    }

    /// Columns the computation reads
    pub fn inputs(&self) -> Vec<&str> {
        match &self.computation {
            Computation::Count => vec![],
            Computation::Sum { column } | Computation::Mean { column } => vec![column.as_str()],
            Computation::Ratio {
                numerator,
                denominator,
                ..
            } => vec![numerator.as_str(), denominator.as_str()],
        }
    }
}

/// Metrics that can be compared across sheets, as `(raw name, display name)`.
///
/// Registered metrics whose inputs are present come first, then every numeric
/// column that isn't an identifier.
pub fn available_metrics(plays: &PlayDf, mode: AnalysisMode) -> Vec<(String, String)> {
    let registered = REGISTRY
        .iter()
        .filter(|metric| metric.is_available(plays))
        .map(|metric| (metric.name.to_string(), metric.display_name.to_string()));

    let columns = plays
        .numeric_columns()
        .into_iter()
        .filter(|column| column != SHEET_ORDER)
        .filter(|column| classify(column, mode) != ColumnCategory::Identifier)
        .map(|column| {
            let display = display_name(&column);
            (column, display)
        });

    registered
        .chain(columns)
        .unique_by(|(name, _)| name.clone())
        .collect()
}

/// A calculation worth offering for the columns at hand
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    pub metric: String,
    pub label: String,
}

/// Suggests comparisons from the catalog: registered rates whose inputs exist,
/// then totals of basic stats and averages of percentage/average columns.
pub fn suggest_calculations(catalog: &ColumnCatalog) -> Vec<Suggestion> {
    let present = |name: &str| catalog.category_of(name).is_some();

    let registered = REGISTRY
        .iter()
        .filter(|metric| present(metric.numerator) && present(metric.denominator))
        .map(|metric| Suggestion {
            metric: metric.name.to_string(),
            label: format!("{} by sheet", metric.display_name),
        });

    let totals = catalog
        .get(ColumnCategory::BasicStat)
        .iter()
        .chain(catalog.get(ColumnCategory::Total))
        .map(|column| Suggestion {
            metric: column.clone(),
            label: format!("Total {} by sheet", display_name(column)),
        });

    let averages = catalog
        .get(ColumnCategory::Percentage)
        .iter()
        .chain(catalog.get(ColumnCategory::Average))
        .map(|column| Suggestion {
            metric: column.clone(),
            label: format!("Average {} by sheet", display_name(column)),
        });

    registered
        .chain(totals)
        .chain(averages)
        .unique_by(|suggestion| suggestion.metric.clone())
        .collect()
}
