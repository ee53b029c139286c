use log::debug;
use snafu::prelude::*;

use std::fs;

use serde_json::Value as JSValue;

use event_atlas::{parse_start_time, UNKNOWN_START};

use crate::viewer::{OpeningFileSnafu, ParsingJsonSnafu, ViewerResult};

/// Reads a reference summary in JSON format.
pub fn read_summary(path: String) -> ViewerResult<JSValue> {
    let contents = fs::read_to_string(path.clone()).context(OpeningFileSnafu { path })?;
    debug!("read content: {:?}", contents);
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}

/// Splits the raw --param overrides into key and value pairs.
pub fn parse_overrides(params: &Option<Vec<String>>) -> ViewerResult<Vec<(String, String)>> {
    let mut overrides: Vec<(String, String)> = Vec::new();
    for raw in params.iter().flatten() {
        match raw.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                overrides.push((key.trim().to_string(), value.trim().to_string()));
            }
            _ => {
                whatever!(
                    "Cannot understand parameter override {:?}, expected key=value",
                    raw
                )
            }
        }
    }
    Ok(overrides)
}

/// Parses a date given on the command line, in the formats accepted by
/// the Start field of events.
pub fn parse_filter_date(value: &str) -> ViewerResult<i64> {
    let time = parse_start_time(value);
    if time == UNKNOWN_START {
        whatever!("Cannot understand date {:?}", value)
    }
    Ok(time)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_parameter_overrides() {
        let params = Some(vec![
            "title=My Atlas".to_string(),
            " acronyms = 1 ".to_string(),
        ]);
        let overrides = parse_overrides(&params).unwrap();
        assert_eq!(
            overrides,
            [
                ("title".to_string(), "My Atlas".to_string()),
                ("acronyms".to_string(), "1".to_string()),
            ]
        );
        assert!(parse_overrides(&None).unwrap().is_empty());
        assert!(parse_overrides(&Some(vec!["oops".to_string()])).is_err());
        assert!(parse_overrides(&Some(vec!["=value".to_string()])).is_err());
    }

    #[test]
    fn parses_filter_dates() {
        assert_eq!(
            parse_filter_date("25/12/1999").unwrap(),
            parse_start_time("25/12/1999")
        );
        assert!(parse_filter_date("sometime").is_err());
    }
}
