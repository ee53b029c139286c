// ********* Input data structures ***********

use std::collections::HashMap;
use std::error::Error;
use std::fmt::Display;

use chrono::TimeZone;
use chrono::Utc;

/// A sheet as handed over by the transports: first row is the header,
/// every following row is one record. Cells are raw strings.
pub type Table = Vec<Vec<String>>;

/// Start time of an event whose date could not be understood.
///
/// It sorts before every real timestamp and is rejected by any active
/// date range.
pub const UNKNOWN_START: i64 = i64::MIN;

pub const MS_IN_MINUTE: i64 = 60_000;
pub const MS_IN_HOUR: i64 = 3_600_000;
pub const MS_IN_DAY: i64 = 86_400_000;
// One mean year, in milliseconds.
pub const MS_IN_YEAR: i64 = 31_557_384_000;
pub const MS_IN_MONTH: i64 = MS_IN_YEAR / 12;

/// The step unit of a date range slider.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum TimeStep {
    Year,
    Month,
    Day,
    Hour,
    Minute,
}

impl TimeStep {
    pub fn millis(&self) -> i64 {
        match self {
            TimeStep::Year => MS_IN_YEAR,
            TimeStep::Month => MS_IN_MONTH,
            TimeStep::Day => MS_IN_DAY,
            TimeStep::Hour => MS_IN_HOUR,
            TimeStep::Minute => MS_IN_MINUTE,
        }
    }
}

/// The categories of sheets that make up a document, in load order.
///
/// Later categories may refer to entities declared by earlier ones, so
/// the order is part of the contract.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum SheetKind {
    Parameters,
    Locations,
    Organisers,
    Events,
    People,
    PeopleAtEvents,
}

impl SheetKind {
    pub const ALL: [SheetKind; 6] = [
        SheetKind::Parameters,
        SheetKind::Locations,
        SheetKind::Organisers,
        SheetKind::Events,
        SheetKind::People,
        SheetKind::PeopleAtEvents,
    ];

    pub fn sheet_name(&self) -> &'static str {
        self.spec().name
    }

    pub fn spec(&self) -> &'static SheetSpec {
        match self {
            SheetKind::Parameters => &SheetSpec {
                name: "Parameters",
                required: &["Parameter", "Value"],
                optional: &[],
                category_optional: false,
            },
            SheetKind::Locations => &SheetSpec {
                name: "Locations",
                required: &["Place", "Lat", "Lng"],
                optional: &["Title", "Color"],
                category_optional: false,
            },
            SheetKind::Organisers => &SheetSpec {
                name: "Organisers",
                required: &["Name"],
                optional: &[],
                category_optional: true,
            },
            SheetKind::Events => &SheetSpec {
                name: "Events",
                required: &["Acronym"],
                optional: &["Title"],
                category_optional: false,
            },
            SheetKind::People => &SheetSpec {
                name: "People",
                required: &["UID", "Last Name", "First Name"],
                optional: &[],
                category_optional: false,
            },
            SheetKind::PeopleAtEvents => &SheetSpec {
                name: "PeopleAtEvents",
                required: &["UID", "Acronym"],
                optional: &[],
                category_optional: false,
            },
        }
    }
}

/// Field contract of one sheet category.
///
/// Required field names are canonicalized before lookup (every
/// non-alphabetic character is removed, so a `Last Name` header is read
/// back as `LastName`). A category marked `category_optional` produces
/// no diagnostic when its sheet is missing altogether.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SheetSpec {
    pub name: &'static str,
    pub required: &'static [&'static str],
    pub optional: &'static [&'static str],
    pub category_optional: bool,
}

// ********* Errors **********

/// Errors from the small fallible surface of the model.
///
/// Data problems never surface here. Bad rows degrade to diagnostics in
/// the [`MessageLog`] and loading continues.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum AtlasError {
    InvalidOptionValue { key: String, value: String },
}

impl Error for AtlasError {}

impl Display for AtlasError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AtlasError::InvalidOptionValue { key, value } => {
                write!(f, "invalid value {:?} for option {}", value, key)
            }
        }
    }
}

// ********* Diagnostics **********

/// Collects the data problems found while loading.
///
/// The whole load path is total: anything wrong with a row or a sheet
/// lands here as one line of text and processing moves on.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct MessageLog {
    messages: Vec<String>,
}

impl MessageLog {
    pub fn new() -> MessageLog {
        MessageLog::default()
    }

    pub fn push(&mut self, msg: String) {
        log::debug!("diagnostic: {}", msg);
        self.messages.push(msg);
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// All messages as one newline-separated block, skipping blank ones.
    pub fn joined(&self) -> String {
        let parts: Vec<&str> = self
            .messages
            .iter()
            .map(|m| m.as_str())
            .filter(|m| !m.is_empty())
            .collect();
        parts.join("\n")
    }
}

// ********* Configuration **********

/// The viewer configuration.
///
/// Defaults match the stock viewer. Values usually come from the
/// `Parameters` sheet, with the host free to override them afterwards.
/// Keys that the model does not recognize are kept verbatim in `extras`
/// so the host can forward them to its own layers.
#[derive(PartialEq, Debug, Clone)]
pub struct Options {
    pub title: String,
    pub marker_icon_size: f64,
    pub origin_marker_icon_size: f64,
    pub origin_marker_color: String,
    pub origin_marker_opacity: f64,
    pub init_lat: f64,
    pub init_lng: f64,
    pub init_zoom: f64,
    pub start_year: i32,
    pub finish_year: i32,
    pub label_year: i32,
    pub link_width: f64,
    pub line_opacity: f64,
    pub line_min_width: f64,
    pub line_max_width: f64,
    pub timeline: bool,
    pub acronyms: bool,
    pub extras: HashMap<String, String>,
}

impl Default for Options {
    fn default() -> Options {
        Options {
            title: "Event Viewer".to_string(),
            marker_icon_size: 4.0,
            origin_marker_icon_size: 1.0,
            origin_marker_color: "#aaaaaa".to_string(),
            origin_marker_opacity: 0.8,
            init_lat: 51.4513915,
            init_lng: -2.5982592,
            init_zoom: 2.0,
            start_year: 1900,
            finish_year: 2100,
            label_year: 50,
            link_width: 2.0,
            line_opacity: 0.5,
            line_min_width: 2.0,
            line_max_width: 17.0,
            timeline: true,
            acronyms: false,
            extras: HashMap::new(),
        }
    }
}

impl Options {
    /// Sets one option from its sheet key and raw value.
    ///
    /// Returns `Ok(true)` when the key is a recognized option and
    /// `Ok(false)` when it was kept as an extra. A recognized key with a
    /// value of the wrong shape is an error.
    pub fn set(&mut self, key: &str, value: &str) -> Result<bool, AtlasError> {
        match key {
            "title" => self.title = value.to_string(),
            "markerIconSize" => self.marker_icon_size = float_value(key, value)?,
            "originMarkerIconSize" => self.origin_marker_icon_size = float_value(key, value)?,
            "originMarkerColor" => self.origin_marker_color = value.to_string(),
            "originMarkerOpacity" => self.origin_marker_opacity = float_value(key, value)?,
            "initLat" => self.init_lat = float_value(key, value)?,
            "initLng" => self.init_lng = float_value(key, value)?,
            "initZoom" => self.init_zoom = float_value(key, value)?,
            "startYear" => self.start_year = int_value(key, value)?,
            "finishYear" => self.finish_year = int_value(key, value)?,
            "labelYear" => self.label_year = int_value(key, value)?,
            "linkWidth" => self.link_width = float_value(key, value)?,
            "lineOpacity" => self.line_opacity = float_value(key, value)?,
            "lineMinWidth" => self.line_min_width = float_value(key, value)?,
            "lineMaxWidth" => self.line_max_width = float_value(key, value)?,
            "timeline" => self.timeline = flag_value(key, value)?,
            "acronyms" => self.acronyms = flag_value(key, value)?,
            _ => {
                self.extras.insert(key.to_string(), value.to_string());
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Time axis lower bound: Jan 1 of `start_year`, UTC.
    pub fn start_time(&self) -> i64 {
        year_start_millis(self.start_year)
    }

    /// Time axis upper bound: Jan 1 of `finish_year`, UTC.
    pub fn finish_time(&self) -> i64 {
        year_start_millis(self.finish_year)
    }
}

pub(crate) fn year_start_millis(year: i32) -> i64 {
    match Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).single() {
        Some(d) => d.timestamp_millis(),
        None => UNKNOWN_START,
    }
}

fn float_value(key: &str, value: &str) -> Result<f64, AtlasError> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| AtlasError::InvalidOptionValue {
            key: key.to_string(),
            value: value.to_string(),
        })
}

fn int_value(key: &str, value: &str) -> Result<i32, AtlasError> {
    value
        .trim()
        .parse::<i32>()
        .map_err(|_| AtlasError::InvalidOptionValue {
            key: key.to_string(),
            value: value.to_string(),
        })
}

fn flag_value(key: &str, value: &str) -> Result<bool, AtlasError> {
    match value.trim() {
        "true" | "on" => Ok(true),
        "false" | "off" => Ok(false),
        v => match v.parse::<f64>() {
            Ok(x) => Ok(x != 0.0),
            Err(_) => Err(AtlasError::InvalidOptionValue {
                key: key.to_string(),
                value: value.to_string(),
            }),
        },
    }
}

// ********* Filtering **********

/// A `|`-delimited set of names, as typed in a filter box.
///
/// Membership is tested on the whole delimited item, so `Paris` is not
/// found in `Paris North|Lyon`.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct DelimitedSet(String);

impl DelimitedSet {
    pub fn new() -> DelimitedSet {
        DelimitedSet::default()
    }

    pub fn from_pattern(pattern: &str) -> DelimitedSet {
        DelimitedSet(pattern.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, item: &str) -> bool {
        format!("|{}|", self.0).contains(&format!("|{}|", item))
    }

    /// Replaces the whole set with one item.
    pub fn set(&mut self, item: &str) {
        self.0 = item.to_string();
    }

    /// Adds an item. Returns false when it was already present.
    pub fn add(&mut self, item: &str) -> bool {
        if self.contains(item) {
            return false;
        }
        let pattern = format!("|{}|{}", self.0, item);
        self.0 = pattern.trim_start_matches('|').to_string();
        true
    }

    pub fn remove(&mut self, item: &str) {
        let pattern = format!("|{}|", self.0).replacen(&format!("|{}|", item), "|", 1);
        self.0 = pattern
            .trim_start_matches('|')
            .trim_end_matches('|')
            .to_string();
    }

    pub fn toggle(&mut self, item: &str) {
        if !self.add(item) {
            self.remove(item);
        }
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

impl Display for DelimitedSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The four conjunctive filter terms applied to events.
///
/// A blank pattern or set deactivates its term. The date term is active
/// only while `start < finish`; the bounds are inclusive.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct FilterQuery {
    pub pattern: String,
    pub start: i64,
    pub finish: i64,
    pub locations: DelimitedSet,
    pub origins: DelimitedSet,
}

impl Default for FilterQuery {
    fn default() -> FilterQuery {
        FilterQuery {
            pattern: String::new(),
            start: 0,
            finish: 0,
            locations: DelimitedSet::new(),
            origins: DelimitedSet::new(),
        }
    }
}

// ******** Output data structures *********

/// A circle marker to draw on the map, either for an event location or
/// for a delegate origin.
#[derive(PartialEq, Debug, Clone)]
pub struct MarkerSpec {
    pub place: String,
    pub lat: f64,
    pub lng: f64,
    pub radius: f64,
    pub color: String,
    pub opacity: f64,
    pub tooltip: String,
}

/// One origin-to-event attendance line with its current aggregate.
///
/// `from` is missing when the origin place is not in the Locations
/// sheet; the count is still maintained for the menus.
#[derive(PartialEq, Debug, Clone)]
pub struct LineState {
    pub origin: String,
    pub dest: String,
    pub from: Option<(f64, f64)>,
    pub to: (f64, f64),
    pub color: String,
    pub opacity: f64,
    pub weight: f64,
    pub count: u64,
    pub tooltip: String,
}

/// Display state of one event column in the timeline table.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ColumnState {
    pub acronym: String,
    pub column: usize,
    pub label: String,
    pub start: String,
    pub title: String,
    pub filtered: bool,
    pub shown: bool,
    pub highlighted: bool,
    pub color: String,
    pub tooltip: String,
}

/// Year labels and per-event tick positions, as ratios of the axis
/// width. A missing tick means the event has no place on the axis.
#[derive(PartialEq, Debug, Clone)]
pub struct TimelineAxis {
    pub labels: Vec<(i32, f64)>,
    pub ticks: Vec<Option<f64>>,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct CountryCount {
    pub origin: String,
    pub count: usize,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct PersonCard {
    pub uid: String,
    pub name: String,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum FieldKind {
    Text,
    Link,
    Image,
}

/// One extra field rendered for an entity. `name` is absent for image
/// values and for fields whose header asked to be unlabeled.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct FieldLine {
    pub name: Option<String>,
    pub value: String,
    pub kind: FieldKind,
}

/// Everything the event pane shows for one event.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct EventDetails {
    pub acronym: String,
    pub label: String,
    pub title: String,
    pub full_title: String,
    pub start: String,
    pub place: String,
    pub event_lines: Vec<FieldLine>,
    pub location_lines: Vec<FieldLine>,
    pub organiser_lines: Vec<FieldLine>,
    pub countries: Vec<CountryCount>,
    pub delegates: Vec<String>,
}

/// One attended event in a person pane.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct AttendanceDetail {
    pub acronym: String,
    pub header: String,
    pub full_title: String,
    pub start: String,
    pub lines: Vec<FieldLine>,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct PersonDetails {
    pub uid: String,
    pub name: String,
    pub role: String,
    pub lines: Vec<FieldLine>,
    pub events: Vec<AttendanceDetail>,
}

// ********* Sandbox **********

/// Row operations of the comparison table.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum RowMove {
    Top,
    Bottom,
    Up,
    Down,
    Clear,
    ClearToBottom,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SandboxCell {
    pub attended: bool,
    pub color: String,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SandboxRow {
    pub uid: String,
    pub name: String,
    pub role: String,
    pub cells: Vec<SandboxCell>,
}

/// The comparison table: one column per event in timeline order, one
/// row per picked person.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SandboxTable {
    pub columns: Vec<String>,
    pub rows: Vec<SandboxRow>,
}
