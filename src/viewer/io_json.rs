// Reads a document kept as a directory of JSON files, one per sheet,
// in the shape returned by the spreadsheet API.

use std::fs;

use log::debug;
use serde_json::Value as JSValue;
use snafu::prelude::*;

use event_atlas::Table;

use crate::viewer::io_common::{number_string, sheet_path, trim_row};
use crate::viewer::{OpeningFileSnafu, ParsingJsonSnafu, ViewerResult};

/// Reads `<dir>/<name>.json` as a table. Both the API response shape
/// `{"values": [[..], ..]}` and a bare array of arrays are accepted;
/// scalar cells are stringified.
pub fn read_sheet(dir: &str, name: &str) -> ViewerResult<Table> {
    let path = sheet_path(dir, name, "json");
    let contents = fs::read_to_string(&path).context(OpeningFileSnafu { path: path.clone() })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    let table = table_from_json(&js, &path)?;
    debug!("read_sheet: {:?} has {} rows", path, table.len());
    Ok(table)
}

fn table_from_json(js: &JSValue, path: &str) -> ViewerResult<Table> {
    let rows = match js {
        JSValue::Object(m) => m.get("values").and_then(|v| v.as_array()),
        JSValue::Array(rows) => Some(rows),
        _ => None,
    };
    let rows = match rows {
        Some(rows) => rows,
        None => {
            whatever!("Expected an array of rows or a values object in {}", path)
        }
    };

    let mut table: Table = Vec::new();
    for row in rows {
        let cells = match row.as_array() {
            Some(cells) => cells,
            None => {
                whatever!("Expected an array of cells in {}, found {}", path, row)
            }
        };
        table.push(trim_row(cells.iter().map(cell_string).collect()));
    }
    Ok(table)
}

fn cell_string(cell: &JSValue) -> String {
    match cell {
        JSValue::String(s) => s.clone(),
        JSValue::Number(n) => match n.as_f64() {
            Some(f) => number_string(f),
            None => n.to_string(),
        },
        JSValue::Bool(b) => b.to_string(),
        JSValue::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_both_document_shapes() {
        let api = json!({"values": [["Place", "Lat", "Lng"], ["Paris", 48.8566, 2.3522]]});
        let table = table_from_json(&api, "Locations.json").unwrap();
        assert_eq!(table[0], ["Place", "Lat", "Lng"]);
        assert_eq!(table[1], ["Paris", "48.8566", "2.3522"]);

        let bare = json!([["UID", "Acronym"], ["U1", "E1"]]);
        let table = table_from_json(&bare, "PeopleAtEvents.json").unwrap();
        assert_eq!(table[1], ["U1", "E1"]);
    }

    #[test]
    fn stringifies_scalars_like_worksheet_cells() {
        let js = json!([["Parameter", "Value"], ["startYear", 1900], ["timeline", true], ["x", null]]);
        let table = table_from_json(&js, "Parameters.json").unwrap();
        assert_eq!(table[1], ["startYear", "1900"]);
        assert_eq!(table[2], ["timeline", "true"]);
        // The trailing null cell is blank and trimmed away.
        assert_eq!(table[3], ["x"]);
    }

    #[test]
    fn rejects_other_shapes() {
        assert!(table_from_json(&json!("rows"), "x.json").is_err());
        assert!(table_from_json(&json!([["ok"], "not a row"]), "x.json").is_err());
        assert!(table_from_json(&json!({"rows": []}), "x.json").is_err());
    }
}
