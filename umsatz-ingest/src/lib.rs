//! umsatz-ingest: normalization of raw bank CSV exports into canonical
//! records, one parser per account kind.

pub mod normalize;
pub mod parsers;

pub use normalize::{LayoutError, NormalizedExport, RowCountMismatch, normalize};
