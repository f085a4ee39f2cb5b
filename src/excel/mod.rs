//! Workbook reader: .xlsx decoding and header-label derivation

mod importer;
pub mod labels;

pub use importer::ExcelImporter;
pub use labels::{assign_labels, MergedRegions};
