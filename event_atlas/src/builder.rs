use crate::config::Table;

/// Assembles a [`Table`] row by row, for tests and for hosts that keep
/// their data in memory instead of sheet files.
///
/// ```
/// use event_atlas::{Atlas, MessageLog, SheetKind, TableBuilder};
///
/// let locations = TableBuilder::new(&["Place", "Lat", "Lng"])
///     .row(&["Paris", "48.8566", "2.3522"])
///     .row(&["Lyon", "45.7640", "4.8357"])
///     .build();
///
/// let mut atlas = Atlas::new();
/// let mut log = MessageLog::new();
/// atlas.load_sheet(SheetKind::Locations, &locations, &mut log);
/// assert!(log.is_empty());
/// ```
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct TableBuilder {
    rows: Vec<Vec<String>>,
}

impl TableBuilder {
    /// Starts a table with its header row.
    pub fn new(header: &[&str]) -> TableBuilder {
        TableBuilder {
            rows: vec![header.iter().map(|c| c.to_string()).collect()],
        }
    }

    /// Appends one data row. Rows may be shorter than the header; the
    /// model reads missing cells as blank.
    pub fn row(mut self, cells: &[&str]) -> TableBuilder {
        self.rows.push(cells.iter().map(|c| c.to_string()).collect());
        self
    }

    pub fn build(self) -> Table {
        self.rows
    }
}
