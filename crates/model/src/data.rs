//! DataFrame conversion into return panels.

use ndarray::Array2;
use polars::prelude::*;
use sintra_primitives::ReturnPanel;

use crate::ModelError;

fn extract_series(df: &DataFrame, name: &str) -> Result<Vec<f64>, ModelError> {
    let column =
        df.column(name).map_err(|_| ModelError::MissingColumn(name.to_string()))?;

    let casted = column
        .cast(&DataType::Float64)
        .map_err(|_| ModelError::InvalidConfig(format!("column {name} is not numeric")))?;
    let chunked = casted
        .f64()
        .map_err(|_| ModelError::InvalidConfig(format!("column {name} is not numeric")))?;

    Ok(chunked.into_iter().map(|opt| opt.unwrap_or(0.0)).collect())
}

/// Build a return panel from the named columns of a frame.
///
/// Numeric columns are cast to `f64`; nulls become zero returns.
///
/// # Errors
/// Returns [`ModelError::MissingColumn`] for an absent column and
/// [`ModelError::InvalidConfig`] for a column that cannot be read as
/// numeric or an empty column list.
pub fn panel_from_frame(df: &DataFrame, columns: &[&str]) -> Result<ReturnPanel, ModelError> {
    if columns.is_empty() {
        return Err(ModelError::InvalidConfig("at least one column is required".to_string()));
    }

    let mut values = Array2::zeros((df.height(), columns.len()));
    for (j, name) in columns.iter().enumerate() {
        for (t, value) in extract_series(df, name)?.into_iter().enumerate() {
            values[[t, j]] = value;
        }
    }

    Ok(ReturnPanel::new(columns.iter().map(|c| (*c).to_string()).collect(), values))
}

/// Build a return panel from every column of a frame except the listed
/// ones, preserving column order. Useful for wide frames with one index
/// column and one return column per series.
///
/// # Errors
/// Propagates the per-column errors of [`panel_from_frame`].
pub fn wide_panel(df: &DataFrame, exclude: &[&str]) -> Result<ReturnPanel, ModelError> {
    let columns: Vec<String> = df
        .get_column_names()
        .iter()
        .filter(|name| !exclude.contains(&name.as_str()))
        .map(|name| name.to_string())
        .collect();
    let refs: Vec<&str> = columns.iter().map(String::as_str).collect();

    panel_from_frame(df, &refs)
}
