//! Survey spreadsheet input for remark.
//!
//! Reads survey exports (CSV, or the first sheet of a workbook, with a header
//! row) into a [`table::SurveyTable`] and picks out the free-text comment
//! columns to analyze.

pub mod columns;
pub mod table;
