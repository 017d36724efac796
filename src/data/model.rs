use std::fmt;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;

use crate::error::Result;

// ---------------------------------------------------------------------------
// ColumnValues – one homogeneous column
// ---------------------------------------------------------------------------

/// Values of a single column. A column is numeric when every non-empty cell
/// parses as a float; empty cells in a numeric column are `NaN`.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValues {
    Numeric(Vec<f64>),
    Text(Vec<String>),
}

impl ColumnValues {
    /// Type a column of raw cells.
    pub fn from_cells(cells: Vec<String>) -> Self {
        let numeric: Option<Vec<f64>> = cells
            .iter()
            .map(|c| {
                if c.is_empty() {
                    Some(f64::NAN)
                } else {
                    c.parse::<f64>().ok()
                }
            })
            .collect();
        match numeric {
            Some(values) => ColumnValues::Numeric(values),
            None => ColumnValues::Text(cells),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnValues::Numeric(v) => v.len(),
            ColumnValues::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_numeric(&self) -> Option<&[f64]> {
        match self {
            ColumnValues::Numeric(v) => Some(v),
            ColumnValues::Text(_) => None,
        }
    }

    fn to_arrow(&self) -> (DataType, ArrayRef) {
        match self {
            ColumnValues::Numeric(v) => (
                DataType::Float64,
                Arc::new(Float64Array::from(v.clone())) as ArrayRef,
            ),
            ColumnValues::Text(v) => (
                DataType::Utf8,
                Arc::new(StringArray::from_iter_values(v.iter())) as ArrayRef,
            ),
        }
    }
}

/// A named column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: ColumnValues,
}

// ---------------------------------------------------------------------------
// TimestepFrame – the parsed content of one file
// ---------------------------------------------------------------------------

/// The table parsed from one file of the set. All columns have the same
/// length.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimestepFrame {
    columns: Vec<Column>,
    rows: usize,
}

impl TimestepFrame {
    /// Build a frame from row-major cells. Every row must already have one
    /// cell per name.
    pub fn from_rows(names: &[String], rows: Vec<Vec<String>>) -> Self {
        let n_rows = rows.len();
        let mut cells: Vec<Vec<String>> = names.iter().map(|_| Vec::with_capacity(n_rows)).collect();
        for row in rows {
            debug_assert_eq!(row.len(), names.len());
            for (col, value) in cells.iter_mut().zip(row) {
                col.push(value);
            }
        }
        let columns = names
            .iter()
            .zip(cells)
            .map(|(name, cells)| Column {
                name: name.clone(),
                values: ColumnValues::from_cells(cells),
            })
            .collect();
        Self {
            columns,
            rows: n_rows,
        }
    }

    pub fn num_rows(&self) -> usize {
        self.rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&ColumnValues> {
        self.columns.iter().find(|c| c.name == name).map(|c| &c.values)
    }

    /// Hand the frame to Arrow consumers: numeric columns become `Float64`,
    /// text columns `Utf8`.
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let (fields, arrays): (Vec<Field>, Vec<ArrayRef>) = self
            .columns
            .iter()
            .map(|c| {
                let (dtype, array) = c.values.to_arrow();
                (Field::new(&c.name, dtype, false), array)
            })
            .unzip();
        let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?;
        Ok(batch)
    }
}

impl fmt::Display for TimestepFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} rows x {} columns [{}]",
            self.rows,
            self.columns.len(),
            self.column_names().join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn columns_are_typed_independently() {
        let names = row(&["x", "label", "v"]);
        let frame = TimestepFrame::from_rows(
            &names,
            vec![row(&["1", "a", "0.5"]), row(&["2", "b", ""])],
        );
        assert_eq!(frame.num_rows(), 2);
        assert_eq!(frame.column("x"), Some(&ColumnValues::Numeric(vec![1.0, 2.0])));
        assert_eq!(
            frame.column("label"),
            Some(&ColumnValues::Text(row(&["a", "b"])))
        );
        let v = frame.column("v").and_then(|c| c.as_numeric()).unwrap();
        assert_eq!(v[0], 0.5);
        assert!(v[1].is_nan());
    }

    #[test]
    fn record_batch_schema_follows_columns() {
        let names = row(&["x", "name"]);
        let frame = TimestepFrame::from_rows(&names, vec![row(&["1", "n1"])]);
        let batch = frame.to_record_batch().unwrap();
        assert_eq!(batch.num_rows(), 1);
        let schema = batch.schema();
        assert_eq!(schema.field(0).data_type(), &DataType::Float64);
        assert_eq!(schema.field(1).data_type(), &DataType::Utf8);
        assert_eq!(schema.field(1).name(), "name");
    }

    #[test]
    fn empty_frame_keeps_names() {
        let names = row(&["a", "b"]);
        let frame = TimestepFrame::from_rows(&names, vec![]);
        assert_eq!(frame.column_names(), vec!["a", "b"]);
        assert_eq!(frame.num_rows(), 0);
        assert_eq!(frame.to_string(), "0 rows x 2 columns [a, b]");
    }
}
