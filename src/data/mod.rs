/// Data layer: file handles, header extraction, table materialization.
///
/// Architecture:
/// ```text
///  t0.txt  t1.txt  ...  tN.txt
///        │
///        ▼
///   ┌──────────┐
///   │ handles  │  open + skip rows → TextStream per file
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  header  │  HeaderExtractor per stream → reconcile_headers → Titles
///   └──────────┘
///        │
///        ▼
///   ┌─────────────┐
///   │ materialize │  rest of each stream → TimestepFrame (stream closed)
///   └─────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  points  │  optional: numeric columns → PointFrame
///   └──────────┘
/// ```

pub mod handles;
pub mod header;
pub mod materialize;
pub mod model;
pub mod points;
