use log::{debug, info, warn};

use event_atlas::*;
use snafu::{prelude::*, Snafu};

use std::fs;

use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::viewer::config_reader::*;

pub mod config_reader;
pub mod io_common;
pub mod io_csv;
pub mod io_json;
pub mod io_xlsx;

#[derive(Debug, Snafu)]
pub enum ViewerError {
    #[snafu(display("Error opening document {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("Worksheet {name} is missing"))]
    MissingSheet { name: String },
    #[snafu(display("Error reading worksheet {name}"))]
    ReadingSheet {
        source: calamine::XlsxError,
        name: String,
    },
    #[snafu(display("Error opening file {path}"))]
    OpeningFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display(""))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Error opening file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display(""))]
    CsvLineParse { source: csv::Error },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type ViewerResult<T> = Result<T, ViewerError>;

pub fn run_viewer(args: &Args) -> ViewerResult<()> {
    let mut atlas = Atlas::new();
    let mut log = MessageLog::new();
    load_document(&mut atlas, &mut log, args)?;
    atlas.finalize(&mut log);
    if !log.is_empty() {
        warn!("Problems found while loading:\n{}", log.joined());
    }

    // Command line overrides win over the Parameters sheet.
    for (key, value) in parse_overrides(&args.param)? {
        match atlas.set_option(&key, &value) {
            Result::Ok(true) => debug!("run_viewer: parameter {} set to {:?}", key, value),
            Result::Ok(false) => info!("run_viewer: parameter {} kept as an extra", key),
            Result::Err(e) => {
                whatever!("Cannot apply parameter override: {}", e)
            }
        }
    }

    atlas.apply_filter(&build_query(args)?);
    if args.show_all {
        atlas.show_all_events();
    }
    let lines = atlas.render_map();

    // Assemble the final json
    let summary_js = build_summary_js(&atlas, &log, &lines);
    let pretty_js = serde_json::to_string_pretty(&summary_js).context(ParsingJsonSnafu {})?;
    match args.out.as_deref() {
        None | Some("stdout") | Some("") => println!("{}", pretty_js),
        Some(path) => fs::write(path, &pretty_js).context(OpeningFileSnafu { path })?,
    }

    // The reference summary, if provided for comparison
    if let Some(reference_path) = &args.reference {
        let reference = read_summary(reference_path.clone())?;
        info!("summary: {:?}", reference);
        let pretty_reference =
            serde_json::to_string_pretty(&reference).context(ParsingJsonSnafu {})?;
        if pretty_reference != pretty_js {
            warn!("Found differences with the reference summary");
            print_diff(pretty_reference.as_str(), pretty_js.as_ref(), "\n");
            whatever!("Difference detected between computed summary and reference summary")
        }
    }

    Ok(())
}

// Replays every sheet of the document into the model. A sheet that a
// transport cannot produce degrades to a diagnostic, except for the
// optional categories.
fn load_document(atlas: &mut Atlas, log: &mut MessageLog, args: &Args) -> ViewerResult<()> {
    let input_type = args.input_type.clone().unwrap_or_else(|| "xlsx".to_string());
    info!(
        "load_document: reading {:?} as input type {}",
        args.input, input_type
    );
    match input_type.as_str() {
        "xlsx" => {
            let mut workbook = io_xlsx::open_document(&args.input)?;
            for sheet in SheetKind::ALL {
                match io_xlsx::read_sheet(&mut workbook, sheet.sheet_name()) {
                    Result::Ok(table) => atlas.load_sheet(sheet, &table, log),
                    Result::Err(e) => report_unloaded_sheet(sheet, &e, log),
                }
            }
        }
        "csv" => {
            for sheet in SheetKind::ALL {
                match io_csv::read_sheet(&args.input, sheet.sheet_name()) {
                    Result::Ok(table) => atlas.load_sheet(sheet, &table, log),
                    Result::Err(e) => report_unloaded_sheet(sheet, &e, log),
                }
            }
        }
        "json" => {
            for sheet in SheetKind::ALL {
                match io_json::read_sheet(&args.input, sheet.sheet_name()) {
                    Result::Ok(table) => atlas.load_sheet(sheet, &table, log),
                    Result::Err(e) => report_unloaded_sheet(sheet, &e, log),
                }
            }
        }
        x => {
            whatever!("Input type not implemented {:?}", x)
        }
    }
    Ok(())
}

fn report_unloaded_sheet(sheet: SheetKind, error: &ViewerError, log: &mut MessageLog) {
    if sheet.spec().category_optional {
        debug!(
            "load_document: skipping optional sheet {:?}: {}",
            sheet, error
        );
    } else {
        log.push(format!(
            "Failed to load sheet {}, {}",
            sheet.sheet_name(),
            error
        ));
    }
}

fn build_query(args: &Args) -> ViewerResult<FilterQuery> {
    let mut query = FilterQuery::default();
    if let Some(pattern) = &args.event_pattern {
        query.pattern = pattern.clone();
    }
    if args.start.is_some() || args.finish.is_some() {
        query.start = match &args.start {
            Some(s) => parse_filter_date(s)?,
            // Every dated event lies above UNKNOWN_START.
            None => UNKNOWN_START + 1,
        };
        query.finish = match &args.finish {
            Some(s) => parse_filter_date(s)?,
            None => i64::MAX,
        };
    }
    if let Some(s) = &args.locations {
        query.locations = DelimitedSet::from_pattern(s);
    }
    if let Some(s) = &args.origins {
        query.origins = DelimitedSet::from_pattern(s);
    }
    Ok(query)
}

fn options_to_json(options: &Options) -> JSValue {
    let mut m: JSMap<String, JSValue> = JSMap::new();
    m.insert("title".to_string(), json!(options.title));
    m.insert("markerIconSize".to_string(), json!(options.marker_icon_size));
    m.insert(
        "originMarkerIconSize".to_string(),
        json!(options.origin_marker_icon_size),
    );
    m.insert(
        "originMarkerColor".to_string(),
        json!(options.origin_marker_color),
    );
    m.insert(
        "originMarkerOpacity".to_string(),
        json!(options.origin_marker_opacity),
    );
    m.insert("initLat".to_string(), json!(options.init_lat));
    m.insert("initLng".to_string(), json!(options.init_lng));
    m.insert("initZoom".to_string(), json!(options.init_zoom));
    m.insert("startYear".to_string(), json!(options.start_year));
    m.insert("finishYear".to_string(), json!(options.finish_year));
    m.insert("labelYear".to_string(), json!(options.label_year));
    m.insert("linkWidth".to_string(), json!(options.link_width));
    m.insert("lineOpacity".to_string(), json!(options.line_opacity));
    m.insert("lineMinWidth".to_string(), json!(options.line_min_width));
    m.insert("lineMaxWidth".to_string(), json!(options.line_max_width));
    m.insert("timeline".to_string(), json!(options.timeline));
    m.insert("acronyms".to_string(), json!(options.acronyms));
    for (key, value) in &options.extras {
        m.insert(key.clone(), json!(value));
    }
    JSValue::Object(m)
}

fn markers_to_json(markers: &[MarkerSpec]) -> Vec<JSValue> {
    let mut l: Vec<JSValue> = Vec::new();
    for marker in markers {
        l.push(json!({
            "place": marker.place,
            "lat": marker.lat,
            "lng": marker.lng,
            "radius": marker.radius,
            "color": marker.color,
            "opacity": marker.opacity,
            "tooltip": marker.tooltip,
        }));
    }
    l
}

fn lines_to_json(lines: &[LineState]) -> Vec<JSValue> {
    let mut l: Vec<JSValue> = Vec::new();
    for line in lines {
        let from = match line.from {
            Some((lat, lng)) => json!([lat, lng]),
            None => JSValue::Null,
        };
        l.push(json!({
            "origin": line.origin,
            "dest": line.dest,
            "from": from,
            "to": [line.to.0, line.to.1],
            "color": line.color,
            "opacity": line.opacity,
            "weight": line.weight,
            "count": line.count,
            "tooltip": line.tooltip,
        }));
    }
    l
}

fn columns_to_json(columns: &[ColumnState]) -> Vec<JSValue> {
    let mut l: Vec<JSValue> = Vec::new();
    for column in columns {
        l.push(json!({
            "acronym": column.acronym,
            "column": column.column,
            "label": column.label,
            "start": column.start,
            "title": column.title,
            "filtered": column.filtered,
            "shown": column.shown,
            "highlighted": column.highlighted,
            "color": column.color,
            "tooltip": column.tooltip,
        }));
    }
    l
}

fn axis_to_json(axis: TimelineAxis) -> JSValue {
    json!({
        "labels": axis.labels,
        "ticks": axis.ticks,
    })
}

fn build_summary_js(atlas: &Atlas, log: &MessageLog, lines: &[LineState]) -> JSValue {
    let axis_js = if atlas.options().timeline {
        axis_to_json(atlas.timeline_axis())
    } else {
        JSValue::Null
    };
    json!({
        "config": options_to_json(atlas.options()),
        "messages": log.messages(),
        "markers": markers_to_json(&atlas.event_markers()),
        "originMarkers": markers_to_json(&atlas.origin_markers()),
        "lines": lines_to_json(lines),
        "columns": columns_to_json(&atlas.timeline_columns()),
        "axis": axis_js,
        "selected": atlas.selected_event(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_args() -> Args {
        Args {
            input: "unused".to_string(),
            input_type: None,
            param: None,
            event_pattern: None,
            start: None,
            finish: None,
            locations: None,
            origins: None,
            show_all: false,
            out: None,
            reference: None,
            verbose: false,
        }
    }

    fn sample_atlas() -> (Atlas, MessageLog) {
        let mut atlas = Atlas::new();
        let mut log = MessageLog::new();
        let locations = TableBuilder::new(&["Place", "Lat", "Lng"])
            .row(&["Paris", "48.8566", "2.3522"])
            .row(&["London", "51.5072", "-0.1276"])
            .build();
        atlas.load_sheet(SheetKind::Locations, &locations, &mut log);
        let events = TableBuilder::new(&["Acronym", "Title", "Start", "Location"])
            .row(&["C1945", "First Congress", "25/9/1945", "London"])
            .row(&["C1949", "Second Congress", "29/6/1949", "Paris"])
            .build();
        atlas.load_sheet(SheetKind::Events, &events, &mut log);
        let people = TableBuilder::new(&["UID", "Last Name", "First Name", "Origin"])
            .row(&["p1", "Dupont", "Marie", "Paris"])
            .build();
        atlas.load_sheet(SheetKind::People, &people, &mut log);
        let attendance = TableBuilder::new(&["UID", "Acronym"])
            .row(&["p1", "C1945"])
            .build();
        atlas.load_sheet(SheetKind::PeopleAtEvents, &attendance, &mut log);
        atlas.finalize(&mut log);
        (atlas, log)
    }

    #[test]
    fn query_is_inactive_without_flags() {
        let query = build_query(&sample_args()).unwrap();
        assert_eq!(query, FilterQuery::default());
    }

    #[test]
    fn open_date_bounds_are_filled_in() {
        let mut args = sample_args();
        args.start = Some("1/1/1946".to_string());
        let query = build_query(&args).unwrap();
        assert_eq!(query.start, parse_start_time("1/1/1946"));
        assert_eq!(query.finish, i64::MAX);

        let mut args = sample_args();
        args.finish = Some("1/1/1946".to_string());
        let query = build_query(&args).unwrap();
        assert_eq!(query.start, UNKNOWN_START + 1);
        assert_eq!(query.finish, parse_start_time("1/1/1946"));
    }

    #[test]
    fn bad_filter_date_is_an_error() {
        let mut args = sample_args();
        args.start = Some("sometime".to_string());
        assert!(build_query(&args).is_err());
    }

    #[test]
    fn optional_sheet_failure_stays_quiet() {
        let mut log = MessageLog::new();
        let error = ViewerError::MissingSheet {
            name: "Organisers".to_string(),
        };
        report_unloaded_sheet(SheetKind::Organisers, &error, &mut log);
        assert!(log.is_empty());

        let error = ViewerError::MissingSheet {
            name: "Events".to_string(),
        };
        report_unloaded_sheet(SheetKind::Events, &error, &mut log);
        assert_eq!(
            log.messages(),
            ["Failed to load sheet Events, Worksheet Events is missing"]
        );
    }

    #[test]
    fn summary_carries_the_viewer_state() {
        let (mut atlas, log) = sample_atlas();
        atlas.apply_filter(&FilterQuery::default());
        atlas.show_all_events();
        let lines = atlas.render_map();
        let js = build_summary_js(&atlas, &log, &lines);

        assert_eq!(js["config"]["title"], "Event Viewer");
        assert_eq!(js["markers"].as_array().unwrap().len(), 2);
        assert_eq!(js["originMarkers"].as_array().unwrap().len(), 1);
        assert_eq!(js["columns"].as_array().unwrap().len(), 2);
        assert_eq!(js["axis"]["ticks"].as_array().unwrap().len(), 2);
        assert!(js["messages"].as_array().unwrap().is_empty());
        let line = &js["lines"].as_array().unwrap()[0];
        assert_eq!(line["origin"], "Paris");
        assert_eq!(line["dest"], "London");
        assert_eq!(line["count"], 1);
        // show_all leaves the last column selected.
        assert_eq!(js["selected"], "C1949");
    }

    #[test]
    fn summary_axis_follows_the_timeline_flag() {
        let (mut atlas, log) = sample_atlas();
        atlas.set_option("timeline", "0").unwrap();
        let lines = atlas.render_map();
        let js = build_summary_js(&atlas, &log, &lines);
        assert!(js["axis"].is_null());
        assert_eq!(js["config"]["timeline"], false);
    }
}
