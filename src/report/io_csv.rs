// Primitives for reading CSV files.

use std::path::Path;

use crate::report::{io_common::simplify_file_name, io_common::Table, *};

pub fn read_csv_table(path: &Path) -> ReportResult<Table> {
    let p = path.display().to_string();
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        // Ragged rows are reported with their line number instead of the csv error.
        .flexible(true)
        .from_path(path)
        .context(CsvOpenSnafu { path: p.clone() })?;
    let mut records = rdr.into_records();

    let header: Vec<String> = match records.next() {
        Some(line_r) => line_r
            .context(CsvLineParseSnafu { lineno: 1usize })?
            .iter()
            .enumerate()
            .map(|(idx, s)| {
                // Spreadsheet exports often start with a byte order mark.
                if idx == 0 {
                    s.trim_start_matches('\u{feff}').to_string()
                } else {
                    s.to_string()
                }
            })
            .collect(),
        None => return EmptyInputSnafu { path: p }.fail(),
    };
    debug!(
        "read_csv_table: {}: header: {:?}",
        simplify_file_name(path),
        header
    );

    let mut rows: Vec<(usize, Vec<String>)> = Vec::new();
    for (idx, line_r) in records.enumerate() {
        let line = line_r.context(CsvLineParseSnafu { lineno: idx + 2 })?;
        // Quoted answers may span several lines.
        let lineno = line
            .position()
            .map(|pos| pos.line() as usize)
            .unwrap_or(idx + 2);
        rows.push((lineno, line.iter().map(|s| s.to_string()).collect()));
    }
    debug!(
        "read_csv_table: {}: {} rows",
        simplify_file_name(path),
        rows.len()
    );
    Table::from_rows(header, rows)
}
