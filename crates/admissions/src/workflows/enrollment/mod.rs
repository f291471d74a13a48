mod columns;
mod importer;
mod matcher;
mod normalizer;
mod parser;
mod router;
mod views;
mod workbook;

pub use columns::{resolve_columns, ColumnMap, ColumnResolutionError, IdentityField};
pub use importer::{EnrollmentImportError, EnrollmentImporter};
pub use matcher::{
    match_rows, IdentityKey, IdentityMatcher, MatchReport, MatchedRow, UnmatchedReason,
    UnmatchedRow, MIN_MATCH_SCORE,
};
pub use parser::RawRow;
pub use router::{enrollment_import_router, MAX_REGISTRAR_BYTES};
pub use views::{ImportCounts, ImportSummary, UnmatchedSample};
