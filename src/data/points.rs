use super::model::{Column, ColumnValues, TimestepFrame};
use crate::error::{ReaderError, Result};

/// Name of the attribute added when Z is copied onto the points.
pub const ELEVATION: &str = "Elevation";

// ---------------------------------------------------------------------------
// PointFrame – a frame split into coordinates and per-point attributes
// ---------------------------------------------------------------------------

/// Point coordinates plus the columns that ride along as point data.
#[derive(Debug, Clone, PartialEq)]
pub struct PointFrame {
    /// `[x, y, z]` per row.
    pub points: Vec<[f64; 3]>,
    /// Names of the columns used for X, Y and Z (fewer when zero-filled).
    pub coordinate_columns: Vec<String>,
    /// Every other column, in frame order.
    pub attributes: Vec<Column>,
}

impl PointFrame {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn attribute(&self, name: &str) -> Option<&ColumnValues> {
        self.attributes.iter().find(|c| c.name == name).map(|c| &c.values)
    }
}

/// Pick the point coordinates out of a frame.
///
/// The first three numeric columns are X, Y and Z. With fewer numeric columns
/// the missing coordinates are zero. When `copy_z` is set, Z is also added as
/// an [`ELEVATION`] attribute.
pub fn select_points(frame: &TimestepFrame, copy_z: bool) -> Result<PointFrame> {
    let coordinate_idx: Vec<usize> = frame
        .columns()
        .iter()
        .enumerate()
        .filter(|(_, c)| c.values.as_numeric().is_some())
        .map(|(i, _)| i)
        .take(3)
        .collect();
    if coordinate_idx.is_empty() {
        return Err(ReaderError::NoNumericColumns);
    }

    let mut points = vec![[0.0; 3]; frame.num_rows()];
    for (axis, &idx) in coordinate_idx.iter().enumerate() {
        if let Some(values) = frame.columns()[idx].values.as_numeric() {
            for (p, v) in points.iter_mut().zip(values) {
                p[axis] = *v;
            }
        }
    }

    let mut attributes: Vec<Column> = frame
        .columns()
        .iter()
        .enumerate()
        .filter(|(i, _)| !coordinate_idx.contains(i))
        .map(|(_, c)| c.clone())
        .collect();
    if copy_z {
        attributes.push(Column {
            name: ELEVATION.to_string(),
            values: ColumnValues::Numeric(points.iter().map(|p| p[2]).collect()),
        });
    }

    Ok(PointFrame {
        points,
        coordinate_columns: coordinate_idx
            .iter()
            .map(|&i| frame.columns()[i].name.clone())
            .collect(),
        attributes,
    })
}
