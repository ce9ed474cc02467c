use std::io::Read;
use std::path::Path;

use calamine::{Data, Reader};
use remark_core::RemarkError;

/// File extensions read as spreadsheet workbooks by [`SurveyTable::from_path`].
pub const WORKBOOK_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// A survey export: named columns over rows of optional text cells.
///
/// Empty cells are missing. Whitespace-only cells are kept; the annotator
/// treats them as blank comments.
///
/// # Examples
///
/// ```
/// use remark_survey::table::SurveyTable;
///
/// let table = SurveyTable::from_csv_str("id,感想\n1,楽しかった\n2,\n").unwrap();
/// assert_eq!(table.row_count(), 2);
/// assert_eq!(table.comments("感想"), vec!["楽しかった"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SurveyTable {
    headers: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl SurveyTable {
    /// Build a table from headers and rows directly.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        Self { headers, rows }
    }

    /// Read a survey from `path`, as a workbook if the extension is one of
    /// [`WORKBOOK_EXTENSIONS`] and as CSV otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`RemarkError::FileNotFound`] if `path` does not exist, or
    /// [`RemarkError::Table`] if the file cannot be parsed.
    pub fn from_path(path: &Path) -> Result<Self, RemarkError> {
        let is_workbook = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| WORKBOOK_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()));
        if is_workbook {
            Self::from_xlsx_path(path)
        } else {
            Self::from_csv_path(path)
        }
    }

    /// Read the first sheet of a workbook. The first row is the header.
    ///
    /// # Errors
    ///
    /// Returns [`RemarkError::FileNotFound`] if `path` does not exist, or
    /// [`RemarkError::Table`] if the workbook cannot be opened or has no sheet.
    pub fn from_xlsx_path(path: &Path) -> Result<Self, RemarkError> {
        if !path.exists() {
            return Err(RemarkError::FileNotFound(path.to_path_buf()));
        }
        let mut workbook = calamine::open_workbook_auto(path).map_err(|e| {
            RemarkError::Table(format!("failed to open workbook {}: {e}", path.display()))
        })?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| RemarkError::Table(format!("{} has no sheets", path.display())))?
            .map_err(|e| RemarkError::Table(format!("failed to read first sheet: {e}")))?;

        let mut sheet_rows = range.rows();
        let headers: Vec<String> = sheet_rows
            .next()
            .map(|row| row.iter().map(|c| c.to_string().trim().to_string()).collect())
            .unwrap_or_default();

        let rows = sheet_rows
            .map(|row| {
                let mut cells: Vec<Option<String>> =
                    row.iter().take(headers.len()).map(sheet_cell).collect();
                cells.resize(headers.len(), None);
                cells
            })
            .collect();

        Ok(Self { headers, rows })
    }

    /// Read a CSV file with a header row.
    ///
    /// # Errors
    ///
    /// Returns [`RemarkError::FileNotFound`] if `path` does not exist, or
    /// [`RemarkError::Table`] if the CSV is malformed.
    pub fn from_csv_path(path: &Path) -> Result<Self, RemarkError> {
        if !path.exists() {
            return Err(RemarkError::FileNotFound(path.to_path_buf()));
        }
        let file = std::fs::File::open(path)?;
        Self::from_csv_reader(file)
    }

    /// Parse CSV text with a header row.
    ///
    /// # Errors
    ///
    /// Returns [`RemarkError::Table`] if the CSV is malformed.
    pub fn from_csv_str(input: &str) -> Result<Self, RemarkError> {
        Self::from_csv_reader(input.as_bytes())
    }

    /// Read CSV from any reader. Rows may be ragged; short rows are padded
    /// with missing cells.
    ///
    /// # Errors
    ///
    /// Returns [`RemarkError::Table`] if the CSV is malformed or not UTF-8.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, RemarkError> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = rdr
            .headers()
            .map_err(|e| RemarkError::Table(format!("failed to read header row: {e}")))?
            .iter()
            .enumerate()
            .map(|(i, h)| {
                // Spreadsheet exports often start with a UTF-8 BOM.
                let h = if i == 0 { h.trim_start_matches('\u{feff}') } else { h };
                h.trim().to_string()
            })
            .collect();

        let mut rows = Vec::new();
        for (line, record) in rdr.records().enumerate() {
            let record = record
                .map_err(|e| RemarkError::Table(format!("failed to parse row {}: {e}", line + 1)))?;
            let mut row: Vec<Option<String>> = record
                .iter()
                .take(headers.len())
                .map(text_cell)
                .collect();
            row.resize(headers.len(), None);
            rows.push(row);
        }

        Ok(Self { headers, rows })
    }

    /// Column labels in file order.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Number of data rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns.
    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Position of the first column named exactly `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Returns `true` if a column named exactly `name` exists.
    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Non-missing cell values of `name`, in row order.
    ///
    /// Returns an empty vec for an unknown column.
    pub fn comments(&self, name: &str) -> Vec<String> {
        let Some(idx) = self.column_index(name) else {
            return Vec::new();
        };
        self.rows
            .iter()
            .filter_map(|row| row.get(idx).cloned().flatten())
            .collect()
    }

    /// Number of non-missing cells in `name`.
    pub fn non_missing_count(&self, name: &str) -> usize {
        let Some(idx) = self.column_index(name) else {
            return 0;
        };
        self.rows
            .iter()
            .filter(|row| matches!(row.get(idx), Some(Some(_))))
            .count()
    }
}

fn text_cell(cell: &str) -> Option<String> {
    (!cell.is_empty()).then(|| cell.to_string())
}

fn sheet_cell(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(s) => text_cell(s),
        other => Some(other.to_string()),
    }
}
