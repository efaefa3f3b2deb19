// Reading the answers from an Excel export (.xlsx).

use std::path::Path;

use calamine::{open_workbook, DataType, Reader, Xlsx};

use crate::report::{io_common::simplify_file_name, io_common::Table, *};

/// Reads the given worksheet, or the first one if no name is provided.
/// The first row is the header.
pub fn read_excel_table(path: &Path, worksheet: Option<&str>) -> ReportResult<Table> {
    let p = path.display().to_string();
    debug!("read_excel_table: path: {:?} worksheet: {:?}", &p, &worksheet);
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path: p.clone() })?;

    let wrange_o = match worksheet {
        Some(name) => workbook.worksheet_range(name),
        None => workbook.worksheet_range_at(0),
    };
    let wrange = wrange_o
        .context(MissingWorksheetSnafu { path: p.clone() })?
        .context(OpeningExcelSnafu { path: p.clone() })?;

    let mut iter = wrange.rows();
    let header: Vec<String> = match iter.next() {
        Some(row) => row
            .iter()
            .map(|cell| cell_to_string(cell, 1))
            .collect::<ReportResult<Vec<String>>>()?,
        None => return EmptyInputSnafu { path: p }.fail(),
    };
    debug!(
        "read_excel_table: {}: header: {:?}",
        simplify_file_name(path),
        header
    );

    let mut rows: Vec<(usize, Vec<String>)> = Vec::new();
    for (idx, row) in iter.enumerate() {
        let lineno = idx + 2;
        let cells = row
            .iter()
            .map(|cell| cell_to_string(cell, lineno))
            .collect::<ReportResult<Vec<String>>>()?;
        rows.push((lineno, cells));
    }
    Table::from_rows(header, rows)
}

// Numbers are written the way a spreadsheet shows them: no trailing `.0` for integers.
fn cell_to_string(cell: &DataType, lineno: usize) -> ReportResult<String> {
    let res = match cell {
        DataType::String(s) => s.clone(),
        DataType::Empty => String::new(),
        DataType::Int(i) => i.to_string(),
        DataType::Float(f) | DataType::DateTime(f) => {
            if f.fract() == 0.0 && f.abs() < 1e15 {
                format!("{}", *f as i64)
            } else {
                f.to_string()
            }
        }
        DataType::Bool(b) => b.to_string(),
        _ => {
            return ExcelWrongCellTypeSnafu {
                lineno,
                content: format!("{:?}", cell),
            }
            .fail()
        }
    };
    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells_as_text() {
        assert_eq!(
            cell_to_string(&DataType::String("Bom".to_string()), 2).unwrap(),
            "Bom"
        );
        assert_eq!(cell_to_string(&DataType::Empty, 2).unwrap(), "");
        assert_eq!(cell_to_string(&DataType::Int(4), 2).unwrap(), "4");
        assert_eq!(cell_to_string(&DataType::Float(5.0), 2).unwrap(), "5");
        assert_eq!(cell_to_string(&DataType::Float(2.5), 2).unwrap(), "2.5");
        assert_eq!(cell_to_string(&DataType::Bool(true), 2).unwrap(), "true");
    }

    #[test]
    fn error_cells() {
        let cell = DataType::Error(calamine::CellErrorType::Div0);
        assert!(matches!(
            cell_to_string(&cell, 7),
            Err(ReportError::ExcelWrongCellType { lineno: 7, .. })
        ));
    }

    #[test]
    fn missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let res = read_excel_table(&dir.path().join("nada.xlsx"), None);
        assert!(matches!(res, Err(ReportError::OpeningExcel { .. })));
    }
}
