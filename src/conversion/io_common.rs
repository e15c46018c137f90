// Primitives shared by all the source readers.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use calamine::{open_workbook_auto, DataType, Reader};

use crate::conversion::*;

/// A source table, as strings. Cells are trimmed.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Table {
    pub path: String,
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// The 1-based line of the first data row in the file.
    pub first_line: usize,
}

impl Table {
    /// Builds a table from raw rows: `skip_rows` rows are dropped, the next one is the header.
    pub fn from_rows(path: &str, rows: Vec<Vec<String>>, skip_rows: usize) -> RunResult<Table> {
        let mut iter = rows.into_iter().skip(skip_rows);
        let header: Vec<String> = iter
            .next()
            .context(EmptyTableSnafu { path })?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();
        debug!("Table::from_rows: {:?}: header: {:?}", path, header);
        let rows: Vec<Vec<String>> = iter
            .map(|r| r.iter().map(|c| c.trim().to_string()).collect())
            .collect();
        Ok(Table {
            path: path.to_string(),
            header,
            rows,
            first_line: skip_rows + 2,
        })
    }

    /// The index of a column, matched case-insensitively.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.header
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name.trim()))
    }

    pub fn require(&self, name: &str) -> RunResult<usize> {
        self.column(name).context(MissingColumnSnafu {
            path: self.path.clone(),
            column: name,
        })
    }

    pub fn lineno(&self, row_index: usize) -> usize {
        self.first_line + row_index
    }
}

/// Reads a CSV or Excel file, depending on its extension.
pub fn read_table(path: &str, worksheet: Option<&str>, skip_rows: usize) -> RunResult<Table> {
    let extension = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());
    match extension.as_deref() {
        Some("xlsx") | Some("xlsm") | Some("xls") => read_excel_table(path, worksheet, skip_rows),
        _ => {
            let file = File::open(path).context(OpeningFileSnafu { path })?;
            read_csv_table(path, file, skip_rows)
        }
    }
}

pub fn read_csv_table<R: Read>(path: &str, reader: R, skip_rows: usize) -> RunResult<Table> {
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);
    let mut rows: Vec<Vec<String>> = Vec::new();
    for (idx, line_r) in rdr.into_records().enumerate() {
        let line = line_r.context(CsvLineParseSnafu {
            path,
            lineno: idx + 1,
        })?;
        rows.push(line.iter().map(|s| s.to_string()).collect());
    }
    Table::from_rows(path, rows, skip_rows)
}

fn read_excel_table(path: &str, worksheet: Option<&str>, skip_rows: usize) -> RunResult<Table> {
    debug!(
        "read_excel_table: path: {:?} worksheet: {:?}",
        path, worksheet
    );
    let mut workbook = open_workbook_auto(path).context(OpeningExcelSnafu { path })?;
    let wrange = match worksheet {
        // A worksheet name was provided, use it.
        Some(name) => workbook
            .worksheet_range(name)
            .context(MissingWorksheetSnafu {
                path,
                worksheet: name,
            })?
            .context(OpeningExcelSnafu { path })?,
        None => workbook
            .worksheet_range_at(0)
            .context(EmptyTableSnafu { path })?
            .context(OpeningExcelSnafu { path })?,
    };
    let rows: Vec<Vec<String>> = wrange
        .rows()
        .map(|row| row.iter().map(cell_to_string).collect())
        .collect();
    Table::from_rows(path, rows, skip_rows)
}

pub fn cell_to_string(cell: &DataType) -> String {
    match cell {
        DataType::String(s) => s.clone(),
        DataType::Int(i) => i.to_string(),
        DataType::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
        DataType::Float(f) => f.to_string(),
        DataType::Bool(b) => b.to_string(),
        DataType::DateTime(_) => cell
            .as_date()
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
        _ => "".to_string(),
    }
}

/// Parses a year cell.
///
/// Accepts `2024`, `2024.0`, and seasons `2024-25`, `2024/2025`, `24/25`, which
/// are recorded as their later year.
pub fn parse_year(cell: &str) -> Option<i32> {
    let s = cell.trim();
    if s.is_empty() {
        return None;
    }
    let plausible = |y: i32| if (1900..=2100).contains(&y) { Some(y) } else { None };
    if let Ok(y) = s.parse::<i32>() {
        return plausible(y);
    }
    if let Ok(f) = s.parse::<f64>() {
        if f.fract() == 0.0 {
            return plausible(f as i32);
        }
        return None;
    }
    let parts: Vec<&str> = s.split(['-', '/']).map(|p| p.trim()).collect();
    match parts.as_slice() {
        [first, second]
            if first.chars().all(|c| c.is_ascii_digit())
                && second.chars().all(|c| c.is_ascii_digit()) =>
        {
            let start: i32 = first.parse().ok()?;
            let end: i32 = second.parse().ok()?;
            match (first.len(), second.len()) {
                (4, 4) => plausible(end),
                (4, 2) => {
                    let century = start / 100 * 100;
                    let y = if century + end < start {
                        century + 100 + end
                    } else {
                        century + end
                    };
                    plausible(y)
                }
                (2, 2) => plausible(2000 + end),
                _ => None,
            }
        }
        _ => None,
    }
}

pub fn cell(row: &[String], idx: usize) -> &str {
    row.get(idx).map(|s| s.as_str()).unwrap_or("")
}

pub fn opt_cell(row: &[String], idx: Option<usize>) -> Option<String> {
    idx.map(|i| cell(row, i))
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

/// The columns every source maps to the shared schema.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RecordColumns {
    pub sport: usize,
    pub first_name: usize,
    pub last_name: usize,
    pub gender: Option<usize>,
    pub date_of_birth: Option<usize>,
    pub year: usize,
    pub level: Option<usize>,
}

impl RecordColumns {
    /// Looks up the columns by name. The optional ones may be absent.
    pub fn find(
        table: &Table,
        gender: &str,
        date_of_birth: &str,
        year: &str,
        level: &str,
    ) -> RunResult<RecordColumns> {
        Ok(RecordColumns {
            sport: table.require("Sport")?,
            first_name: table.require("First Name")?,
            last_name: table.require("Last Name")?,
            gender: table.column(gender),
            date_of_birth: table.column(date_of_birth),
            year: table.require(year)?,
            level: table.column(level),
        })
    }
}

/// Maps one row to a record. Returns None, with a warning, when the row lacks
/// a sport, a name or a usable year.
pub fn make_record(
    table: &Table,
    row_index: usize,
    row: &[String],
    cols: &RecordColumns,
    source: SourceKind,
    year_cell: &str,
    css_flag: bool,
) -> Option<RawRecord> {
    let lineno = table.lineno(row_index);
    let sport = cell(row, cols.sport);
    let first_name = cell(row, cols.first_name);
    let last_name = cell(row, cols.last_name);
    if sport.is_empty() {
        warn!("make_record: {:?} line {}: no sport, skipping", table.path, lineno);
        return None;
    }
    if first_name.is_empty() && last_name.is_empty() {
        warn!("make_record: {:?} line {}: no name, skipping", table.path, lineno);
        return None;
    }
    let year = match parse_year(year_cell) {
        Some(y) => y,
        None => {
            warn!(
                "make_record: {:?} line {}: unreadable year {:?}, skipping",
                table.path, lineno, year_cell
            );
            return None;
        }
    };
    Some(RawRecord {
        source,
        sport: sport.to_string(),
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        gender: opt_cell(row, cols.gender),
        date_of_birth: opt_cell(row, cols.date_of_birth),
        year,
        program_level: opt_cell(row, cols.level),
        css_flag,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn years() {
        assert_eq!(parse_year("2024"), Some(2024));
        assert_eq!(parse_year(" 2024.0 "), Some(2024));
        assert_eq!(parse_year("2024-25"), Some(2025));
        assert_eq!(parse_year("1999-00"), Some(2000));
        assert_eq!(parse_year("2024/2025"), Some(2025));
        assert_eq!(parse_year("24/25"), Some(2025));
        assert_eq!(parse_year("2024.5"), None);
        assert_eq!(parse_year("next year"), None);
        assert_eq!(parse_year(""), None);
        assert_eq!(parse_year("12"), None);
    }

    #[test]
    fn excel_dates() {
        assert_eq!(cell_to_string(&DataType::DateTime(38124.0)), "2004-05-17");
        assert_eq!(cell_to_string(&DataType::DateTime(25569.0)), "1970-01-01");
        assert_eq!(cell_to_string(&DataType::DateTime(38124.75)), "2004-05-17");
        assert_eq!(cell_to_string(&DataType::Float(2021.0)), "2021");
        assert_eq!(cell_to_string(&DataType::Empty), "");
    }

    #[test]
    fn csv_table_with_skipped_rows() {
        let data = "Roster export\nUpdated 2024,,\nSport , first name,Last Name\n Rowing ,Jon,Smith\nJudo,Ana\n";
        let table = read_csv_table("mem.csv", data.as_bytes(), 2).unwrap();
        assert_eq!(table.header, vec!["Sport", "first name", "Last Name"]);
        assert_eq!(table.column("FIRST NAME"), Some(1));
        assert_eq!(table.rows[0], vec!["Rowing", "Jon", "Smith"]);
        // Short rows are kept.
        assert_eq!(table.rows[1].len(), 2);
        assert_eq!(table.lineno(0), 4);
        assert!(matches!(
            table.require("Year"),
            Err(RunError::MissingColumn { .. })
        ));
    }

    #[test]
    fn empty_csv_fails() {
        let res = read_csv_table("mem.csv", "".as_bytes(), 0);
        assert!(matches!(res, Err(RunError::EmptyTable { .. })));
    }
}
