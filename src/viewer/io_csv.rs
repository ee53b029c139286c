// Reads a document kept as a directory of CSV files, one per sheet.

use log::debug;
use snafu::prelude::*;

use event_atlas::Table;

use crate::viewer::io_common::{sheet_path, trim_row};
use crate::viewer::{CsvLineParseSnafu, CsvOpenSnafu, ViewerResult};

/// Reads `<dir>/<name>.csv` as a table. The first record is the header
/// row, exactly as in a worksheet.
pub fn read_sheet(dir: &str, name: &str) -> ViewerResult<Table> {
    let path = sheet_path(dir, name, "csv");
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(&path)
        .context(CsvOpenSnafu { path: path.clone() })?;

    let mut table: Table = Vec::new();
    for record in rdr.into_records() {
        let record = record.context(CsvLineParseSnafu {})?;
        let cells: Vec<String> = record.iter().map(|c| c.to_string()).collect();
        table.push(trim_row(cells));
    }
    debug!("read_sheet: {:?} has {} rows", path, table.len());
    Ok(table)
}
