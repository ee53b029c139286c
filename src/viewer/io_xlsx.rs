// Reads the sheets of an xlsx workbook as tables.

use std::fs::File;
use std::io::BufReader;

use calamine::{open_workbook, DataType, Reader, Xlsx};
use log::debug;
use snafu::prelude::*;

use event_atlas::Table;

use crate::viewer::io_common::{number_string, trim_row};
use crate::viewer::{MissingSheetSnafu, OpeningExcelSnafu, ReadingSheetSnafu, ViewerResult};

pub type Workbook = Xlsx<BufReader<File>>;

pub fn open_document(path: &str) -> ViewerResult<Workbook> {
    open_workbook(path).context(OpeningExcelSnafu { path })
}

/// Reads one worksheet by name. Every cell is read back as the string a
/// viewer of the sheet would see.
pub fn read_sheet(workbook: &mut Workbook, name: &str) -> ViewerResult<Table> {
    let wrange = workbook
        .worksheet_range(name)
        .context(MissingSheetSnafu { name })?
        .context(ReadingSheetSnafu { name })?;
    let mut table: Table = Vec::new();
    for row in wrange.rows() {
        let cells: Vec<String> = row.iter().map(cell_string).collect();
        table.push(trim_row(cells));
    }
    debug!("read_sheet: {} has {} rows", name, table.len());
    Ok(table)
}

fn cell_string(cell: &DataType) -> String {
    match cell {
        DataType::String(s) => s.clone(),
        DataType::Float(f) => number_string(*f),
        DataType::Int(i) => i.to_string(),
        DataType::Bool(b) => b.to_string(),
        DataType::DateTime(f) => number_string(*f),
        DataType::Empty | DataType::Error(_) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells_read_back_as_strings() {
        assert_eq!(cell_string(&DataType::String("Paris".to_string())), "Paris");
        assert_eq!(cell_string(&DataType::Float(1945.0)), "1945");
        assert_eq!(cell_string(&DataType::Float(48.8566)), "48.8566");
        assert_eq!(cell_string(&DataType::Int(-3)), "-3");
        assert_eq!(cell_string(&DataType::Bool(true)), "true");
        assert_eq!(cell_string(&DataType::Empty), "");
    }
}
