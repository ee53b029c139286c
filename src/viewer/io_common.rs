// Helpers shared by the sheet transports.

use std::path::PathBuf;

/// Path of one sheet file inside a document directory.
pub fn sheet_path(dir: &str, name: &str, extension: &str) -> String {
    let p: PathBuf = [dir, &format!("{}.{}", name, extension)].iter().collect();
    p.as_path().display().to_string()
}

/// Renders a numeric cell the way worksheet cells read back: integral
/// values lose their trailing `.0`.
pub fn number_string(x: f64) -> String {
    if x.is_finite() && x == x.trunc() && x.abs() < 1e15 {
        format!("{}", x as i64)
    } else {
        x.to_string()
    }
}

/// Drops the trailing blank cells of a row, so padded worksheets and
/// ragged CSV files produce the same table.
pub fn trim_row(mut row: Vec<String>) -> Vec<String> {
    while row.last().map(|c| c.is_empty()).unwrap_or(false) {
        row.pop();
    }
    row
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_read_like_cells() {
        assert_eq!(number_string(48.0), "48");
        assert_eq!(number_string(-2.5982592), "-2.5982592");
        assert_eq!(number_string(0.0), "0");
    }

    #[test]
    fn trailing_blanks_are_dropped() {
        let row = vec![
            "Paris".to_string(),
            "".to_string(),
            "2.35".to_string(),
            "".to_string(),
            "".to_string(),
        ];
        assert_eq!(trim_row(row), ["Paris", "", "2.35"]);
        assert!(trim_row(vec!["".to_string()]).is_empty());
    }
}
