use crate::{PlayType, Result, PLAY, PLAY_TYPE, SHEET_NAME};
use polars::{prelude::*, sql::SQLContext};

/// Runs a SQL query against the play table, registered as `plays`.
pub fn filter_sql(df: LazyFrame, query: &str) -> Result<LazyFrame> {
    let mut ctx = SQLContext::new();
    ctx.register("plays", df);
    let df = ctx.execute(query)?;
    Ok(df)
}

/// Builds a filter expression over a normalized play table.
#[derive(Clone, Default)]
pub struct PlayFilter {
    filter_expr: Option<Expr>,
}

impl PlayFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sheet(self, sheet_name: &str) -> Self {
        let expr = col(SHEET_NAME).eq(lit(sheet_name));
        self.extend_filter(expr)
    }

    pub fn play_type(self, play_type: PlayType) -> Self {
        let expr = col(PLAY_TYPE).eq(lit(play_type.as_str()));
        self.extend_filter(expr)
    }

    // Matches any of the given play numbers. The play column may still be text
    // when a sheet numbers its plays oddly, so compare numerically.
    pub fn plays(self, play_numbers: &[f64]) -> Self {
        let expr = play_numbers
            .iter()
            .map(|number| col(PLAY).cast(DataType::Float64).eq(lit(*number)))
            .reduce(|acc, expr| acc.or(expr))
            .unwrap_or_else(|| lit(false));
        self.extend_filter(expr)
    }

    // Combines the current filter with a new one using AND logic
    fn extend_filter(mut self, new_expr: Expr) -> Self {
        self.filter_expr = match self.filter_expr.take() {
            Some(existing_expr) => Some(existing_expr.and(new_expr)),
            None => Some(new_expr),
        };
        self
    }

    // Builds the final filter expression
    pub fn build(self) -> Expr {
        self.filter_expr.unwrap_or_else(|| lit(true))
    }
}
