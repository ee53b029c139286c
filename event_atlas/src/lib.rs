mod builder;
mod config;
pub mod manual;
pub mod quick_start;

use log::{debug, info};

use std::collections::HashMap;

use chrono::{Months, NaiveDate, NaiveDateTime, TimeZone, Utc};
use regex::Regex;

pub use crate::builder::TableBuilder;
pub use crate::config::*;

// **** Private structures ****

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
struct LocationId(u32);

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
struct OrganiserId(u32);

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
struct PersonId(u32);

#[derive(PartialEq, Debug, Clone)]
struct Location {
    place: String,
    lat: Option<f64>,
    lng: Option<f64>,
    title: String,
    color_override: String,
    // Computed when the model is finalized.
    color: String,
    // 1-based order in which events first referenced this place.
    event_rank: Option<u32>,
    // Origins whose delegates attend events here, first-seen order.
    line_origins: Vec<String>,
    fields: HashMap<String, String>,
}

#[derive(Eq, PartialEq, Debug, Clone)]
struct Organiser {
    name: String,
    fields: HashMap<String, String>,
}

// Delegates of one origin attending one event, in join order.
#[derive(Eq, PartialEq, Debug, Clone)]
struct Country {
    origin: String,
    delegates: Vec<String>,
}

#[derive(Eq, PartialEq, Debug, Clone)]
struct Event {
    acronym: String,
    title: String,
    start_raw: String,
    end_raw: String,
    start_time: i64,
    location: LocationId,
    organiser: Option<OrganiserId>,
    countries: Vec<Country>,
    filtered: bool,
    shown: bool,
    fields: HashMap<String, String>,
}

// One origin-to-destination aggregate. The count is recomputed from
// scratch on every render pass.
#[derive(Eq, PartialEq, Debug, Clone)]
struct AttendanceLine {
    origin: String,
    dest: LocationId,
    origin_loc: Option<LocationId>,
    count: u64,
    highlighted: bool,
}

#[derive(Eq, PartialEq, Debug, Clone)]
struct Person {
    uid: String,
    first_name: String,
    last_name: String,
    name: String,
    origin: String,
    attendance: Vec<Attendance>,
    fields: HashMap<String, String>,
}

// One attendance row, kept with its own fields for the person pane.
#[derive(Eq, PartialEq, Debug, Clone)]
struct Attendance {
    acronym: String,
    fields: HashMap<String, String>,
}

// Read access to the raw sheet fields of an entity.
trait EntityFields {
    fn field(&self, name: &str) -> Option<&str>;
}

impl EntityFields for Location {
    fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(|v| v.as_str())
    }
}

impl EntityFields for Organiser {
    fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(|v| v.as_str())
    }
}

impl EntityFields for Event {
    fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(|v| v.as_str())
    }
}

impl EntityFields for Person {
    fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(|v| v.as_str())
    }
}

impl EntityFields for Attendance {
    fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(|v| v.as_str())
    }
}

// **** The model ****

/// The whole viewer model: locations, organisers, events, people and
/// the attendance join between them.
///
/// Sheets are replayed into the model with [`Atlas::load_sheet`] in the
/// order given by [`SheetKind::ALL`], then [`Atlas::finalize`] sorts the
/// timeline and derives colors, attendance lines and origin markers.
/// Everything else is a pure view over that state, except the explicit
/// mutators for filtering, visibility and selection.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct Atlas {
    options: Options,
    locations: Vec<Location>,
    location_index: HashMap<String, LocationId>,
    organisers: Vec<Organiser>,
    organiser_index: HashMap<String, OrganiserId>,
    events: Vec<Event>,
    people: Vec<Person>,
    person_index: HashMap<String, PersonId>,
    extra_fields: HashMap<SheetKind, Vec<String>>,
    // Event-bearing locations in discovery order.
    event_places: Vec<LocationId>,
    lines: Vec<AttendanceLine>,
    line_index: HashMap<(LocationId, String), usize>,
    // Located delegate origins in discovery order.
    origin_places: Vec<LocationId>,
    current: Option<usize>,
}

impl Atlas {
    pub fn new() -> Atlas {
        Atlas::default()
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Sets one option by its sheet key, keeping unknown keys as extras.
    pub fn set_option(&mut self, key: &str, value: &str) -> Result<bool, AtlasError> {
        self.options.set(key, value)
    }

    // ---- Loading ----

    /// Replays one sheet into the model.
    ///
    /// The first row is the header; it must carry every required field
    /// of the category exactly once, otherwise the sheet is rejected
    /// with a diagnostic and no row is read. Rows never fail: a row
    /// that cannot be used becomes a diagnostic in `log` or is skipped.
    pub fn load_sheet(&mut self, kind: SheetKind, table: &[Vec<String>], log: &mut MessageLog) {
        let empty: Vec<String> = Vec::new();
        let header = table.first().unwrap_or(&empty);
        debug!(
            "load_sheet: {:?}: {} data rows, header {:?}",
            kind,
            table.len().saturating_sub(1),
            header
        );

        let field_map = match self.extract_fields(kind, header, log) {
            Some(m) => m,
            None => return,
        };

        for row in table.iter().skip(1) {
            let fields = copy_fields(&field_map, row);
            match kind {
                SheetKind::Parameters => self.load_param_row(&fields, log),
                SheetKind::Locations => self.load_location_row(fields),
                SheetKind::Organisers => self.load_organiser_row(fields),
                SheetKind::Events => self.load_event_row(fields, log),
                SheetKind::People => self.load_person_row(fields),
                SheetKind::PeopleAtEvents => self.load_attendance_row(fields, log),
            }
        }
    }

    // Header recognition. Extra field names accumulate on the category
    // across loads, whether or not the sheet is accepted.
    fn extract_fields(
        &mut self,
        kind: SheetKind,
        header: &[String],
        log: &mut MessageLog,
    ) -> Option<HashMap<String, usize>> {
        let spec = kind.spec();
        let mut indexes: HashMap<String, usize> = HashMap::new();
        let mut required_count = 0;
        let mut duplicate_required = false;
        let mut extra_local: Vec<String> = Vec::new();

        for (field_index, cell) in header.iter().enumerate() {
            let initial = match cell.chars().next() {
                Some(c) => c,
                None => continue,
            };
            if !('A'..='[').contains(&initial) {
                continue;
            }

            if spec.required.contains(&cell.as_str()) {
                let canonical = canonical_field(cell);
                if indexes.insert(canonical, field_index).is_some() {
                    duplicate_required = true;
                } else {
                    required_count += 1;
                }
            } else {
                if !spec.optional.contains(&cell.as_str()) {
                    extra_local.push(cell.clone());
                }
                indexes.insert(cell.clone(), field_index);
            }
        }

        let known = self.extra_fields.entry(kind).or_default();
        for name in extra_local {
            if !known.contains(&name) {
                known.push(name);
            }
        }

        if duplicate_required || required_count != spec.required.len() {
            let wanted: Vec<String> = spec.required.iter().map(|f| format!("{:?}", f)).collect();
            log.push(format!(
                "{} sheet missing fields [{}]",
                spec.name,
                wanted.join(",")
            ));
            return None;
        }
        Some(indexes)
    }

    fn load_param_row(&mut self, fields: &HashMap<String, String>, log: &mut MessageLog) {
        let parameter = field(fields, "Parameter");
        if parameter.is_empty() {
            return;
        }
        if let Err(e) = self.options.set(parameter, field(fields, "Value")) {
            log.push(e.to_string());
        }
    }

    fn load_location_row(&mut self, fields: HashMap<String, String>) {
        let place = field(&fields, "Place").to_string();
        if place.is_empty() {
            return;
        }
        let id = LocationId(self.locations.len() as u32);
        self.locations.push(Location {
            place: place.clone(),
            lat: field(&fields, "Lat").parse::<f64>().ok(),
            lng: field(&fields, "Lng").parse::<f64>().ok(),
            title: field(&fields, "Title").to_string(),
            color_override: field(&fields, "Color").to_string(),
            color: "#FFFFFF".to_string(),
            event_rank: None,
            line_origins: Vec::new(),
            fields,
        });
        self.location_index.insert(place, id);
    }

    fn load_organiser_row(&mut self, fields: HashMap<String, String>) {
        let name = field(&fields, "Name").to_string();
        let id = OrganiserId(self.organisers.len() as u32);
        self.organisers.push(Organiser {
            name: name.clone(),
            fields,
        });
        self.organiser_index.insert(name, id);
    }

    fn load_event_row(&mut self, fields: HashMap<String, String>, log: &mut MessageLog) {
        let acronym = field(&fields, "Acronym").to_string();
        if acronym.is_empty() {
            return;
        }

        let place = field(&fields, "Location").to_string();
        let location = match self.location_index.get(&place) {
            Some(&id) => id,
            None => {
                log.push(format!("Unknown location {} for {}", place, acronym));
                return;
            }
        };

        if self.locations[location.0 as usize].event_rank.is_none() {
            let rank = self.event_places.len() as u32 + 1;
            let loc = &mut self.locations[location.0 as usize];
            loc.event_rank = Some(rank);
            loc.line_origins.clear();
            self.event_places.push(location);
        }

        let organiser = self
            .organiser_index
            .get(field(&fields, "Organiser"))
            .copied();
        let start_raw = field(&fields, "Start").to_string();
        self.events.push(Event {
            acronym,
            title: field(&fields, "Title").to_string(),
            start_time: parse_start_time(&start_raw),
            start_raw,
            end_raw: field(&fields, "End").to_string(),
            location,
            organiser,
            countries: Vec::new(),
            filtered: true,
            shown: false,
            fields,
        });
    }

    fn load_person_row(&mut self, fields: HashMap<String, String>) {
        let uid = field(&fields, "UID").to_string();
        let first_name = field(&fields, "FirstName").to_string();
        let last_name = field(&fields, "LastName").to_string();
        let id = PersonId(self.people.len() as u32);
        self.people.push(Person {
            name: join_text(&[&first_name, " ", &last_name]),
            uid: uid.clone(),
            first_name,
            last_name,
            origin: field(&fields, "Origin").to_string(),
            attendance: Vec::new(),
            fields,
        });
        self.person_index.insert(uid, id);
    }

    // The attendance join. A row binds one person to one event and, when
    // the person has an origin, counts them into the per-origin group of
    // that event.
    fn load_attendance_row(&mut self, fields: HashMap<String, String>, log: &mut MessageLog) {
        let uid = field(&fields, "UID").to_string();
        if uid.is_empty() {
            return;
        }
        let acronym = field(&fields, "Acronym").to_string();

        let person = self.person_index.get(&uid).copied();
        let event = self.find_event(&acronym);
        let (person, event) = match (person, event) {
            (Some(p), Some(e)) => (p, e),
            _ => {
                log.push(format!("Unknown PersonAtEvents {}, {}", uid, acronym));
                return;
            }
        };

        let origin = self.people[person.0 as usize].origin.clone();
        self.people[person.0 as usize].attendance.push(Attendance {
            acronym: acronym.clone(),
            fields,
        });

        if origin.is_empty() {
            return;
        }
        let ev = &mut self.events[event];
        match ev.countries.iter_mut().find(|c| c.origin == origin) {
            Some(country) => country.delegates.push(uid),
            None => ev.countries.push(Country {
                origin: origin.clone(),
                delegates: vec![uid],
            }),
        }
        let loc = &mut self.locations[ev.location.0 as usize];
        if !loc.line_origins.iter().any(|o| *o == origin) {
            loc.line_origins.push(origin);
        }
    }

    /// Derives everything that depends on the complete data set: sorts
    /// events by start time (unknown dates first), assigns location
    /// colors by discovery rank, materializes the attendance lines and
    /// registers the delegate origins.
    ///
    /// Call it once, after the last sheet.
    pub fn finalize(&mut self, log: &mut MessageLog) {
        self.events.sort_by_key(|e| e.start_time);

        let count = self.event_places.len();
        for &lid in &self.event_places {
            let loc = &mut self.locations[lid.0 as usize];
            let rank = loc.event_rank.unwrap_or(1);
            let ratio = if count <= 1 {
                0.0
            } else {
                (rank - 1) as f64 / (count - 1) as f64
            };
            loc.color = if loc.color_override.is_empty() {
                rainbow_color(ratio)
            } else {
                loc.color_override.clone()
            };
        }

        self.lines.clear();
        self.line_index.clear();
        self.origin_places.clear();
        let mut missing: Vec<String> = Vec::new();
        for place_pos in 0..self.event_places.len() {
            let dest = self.event_places[place_pos];
            let origins = self.locations[dest.0 as usize].line_origins.clone();
            for origin in origins {
                // An origin only counts as resolved with coordinates to
                // draw it at; a located row is required for the registry.
                let origin_loc = match self.location_index.get(&origin) {
                    Some(&id) if self.located(id) => {
                        if !self.origin_places.contains(&id) {
                            self.origin_places.push(id);
                        }
                        Some(id)
                    }
                    _ => {
                        if !missing.contains(&origin) {
                            missing.push(origin.clone());
                        }
                        None
                    }
                };
                self.line_index
                    .insert((dest, origin.clone()), self.lines.len());
                self.lines.push(AttendanceLine {
                    origin,
                    dest,
                    origin_loc,
                    count: 0,
                    highlighted: false,
                });
            }
        }
        for origin in missing {
            log.push(format!("People Origin: {} not in Locations", origin));
        }

        info!(
            "finalize: {} events at {} locations, {} people, {} attendance lines",
            self.events.len(),
            self.event_places.len(),
            self.people.len(),
            self.lines.len()
        );
    }

    // ---- Filtering ----

    /// Re-evaluates the filter flag of every event.
    ///
    /// The four terms are conjunctive and an inactive term accepts
    /// everything. Ordering and column numbers never change here.
    pub fn apply_filter(&mut self, query: &FilterQuery) {
        let regex = compile_pattern(&query.pattern);
        let time_active = query.start < query.finish;

        let decisions: Vec<bool> = self
            .events
            .iter()
            .map(|event| {
                let label_ok = match &regex {
                    Some(re) => re.is_match(&self.event_label(event)),
                    None => true,
                };
                let time_ok = !time_active
                    || (event.start_time >= query.start && event.start_time <= query.finish);
                let location_ok = query.locations.is_empty()
                    || query
                        .locations
                        .contains(&self.locations[event.location.0 as usize].place);
                let origin_ok = query.origins.is_empty()
                    || event
                        .countries
                        .iter()
                        .any(|c| query.origins.contains(&c.origin));
                label_ok && time_ok && location_ok && origin_ok
            })
            .collect();

        for (event, filtered) in self.events.iter_mut().zip(decisions) {
            event.filtered = filtered;
        }
        debug!(
            "apply_filter: {} of {} events pass",
            self.events.iter().filter(|e| e.filtered).count(),
            self.events.len()
        );
    }

    // ---- Visibility and selection ----

    pub fn show_all_events(&mut self) {
        for idx in 0..self.events.len() {
            self.events[idx].shown = true;
            self.current = Some(idx);
        }
    }

    pub fn hide_all_events(&mut self) {
        for event in &mut self.events {
            event.shown = false;
        }
    }

    /// Shows or hides one event on the map. Showing an event also makes
    /// it the current selection. Returns false for an unknown acronym.
    pub fn set_event_shown(&mut self, acronym: &str, shown: bool) -> bool {
        match self.find_event(acronym) {
            Some(idx) => {
                self.events[idx].shown = shown;
                if shown {
                    self.current = Some(idx);
                }
                true
            }
            None => false,
        }
    }

    pub fn toggle_event_shown(&mut self, acronym: &str) -> bool {
        match self.find_event(acronym) {
            Some(idx) => {
                let shown = !self.events[idx].shown;
                self.events[idx].shown = shown;
                if shown {
                    self.current = Some(idx);
                }
                true
            }
            None => false,
        }
    }

    pub fn select_event(&mut self, acronym: &str) -> bool {
        match self.find_event(acronym) {
            Some(idx) => {
                self.current = Some(idx);
                true
            }
            None => false,
        }
    }

    pub fn selected_event(&self) -> Option<&str> {
        self.current.map(|idx| self.events[idx].acronym.as_str())
    }

    /// Moves the selection to the next event that passes the filter,
    /// wrapping around in either direction. A direction of 0 starts the
    /// search on the current event itself. Returns the new selection,
    /// or None when no event passes the filter.
    pub fn next_filtered(&mut self, direction: i32) -> Option<String> {
        if self.events.is_empty() {
            return None;
        }
        let len = self.events.len() as i64;
        let current = self.current.unwrap_or(0) as i64;
        let mut dir = direction as i64;
        let mut idx = current;
        loop {
            idx += dir;
            if dir == 0 {
                dir = 1;
            }
            if idx < 0 {
                idx = len - 1;
            }
            if idx >= len {
                idx = 0;
            }
            if self.events[idx as usize].filtered {
                self.current = Some(idx as usize);
                return Some(self.events[idx as usize].acronym.clone());
            }
            if idx == current {
                return None;
            }
        }
    }

    // ---- Map views ----

    /// Recomputes every attendance line from the currently filtered and
    /// shown events, then returns the drawable line states.
    ///
    /// Running it twice without a state change yields the same result.
    pub fn render_map(&mut self) -> Vec<LineState> {
        for line in &mut self.lines {
            line.count = 0;
        }
        let mut adds: Vec<(usize, u64)> = Vec::new();
        for event in &self.events {
            if !(event.filtered && event.shown) {
                continue;
            }
            for country in &event.countries {
                if let Some(&line) = self
                    .line_index
                    .get(&(event.location, country.origin.clone()))
                {
                    adds.push((line, country.delegates.len() as u64));
                }
            }
        }
        for (line, add) in adds {
            self.lines[line].count += add;
        }

        let mut states: Vec<LineState> = Vec::new();
        for line in &self.lines {
            let dest = &self.locations[line.dest.0 as usize];
            let to = match (dest.lat, dest.lng) {
                (Some(lat), Some(lng)) => (lat, lng),
                _ => continue,
            };
            let weight = if line.count == 0 {
                0.0
            } else {
                clamp_range(
                    line.count as f64,
                    self.options.line_min_width,
                    self.options.line_max_width,
                )
            };
            states.push(LineState {
                origin: line.origin.clone(),
                dest: dest.place.clone(),
                from: line.origin_loc.and_then(|id| self.lat_lng(id)),
                to,
                color: dest.color.clone(),
                opacity: if line.highlighted {
                    1.0
                } else {
                    self.options.line_opacity
                },
                weight,
                count: line.count,
                tooltip: format!("{}→{}: {}", line.origin, dest.place, line.count),
            });
        }
        debug!("render_map: {} drawable lines", states.len());
        states
    }

    /// Brightens or dims one line, as when hovering it.
    pub fn set_line_highlight(&mut self, dest: &str, origin: &str, highlighted: bool) -> bool {
        let dest = match self.location_index.get(dest) {
            Some(&id) => id,
            None => return false,
        };
        match self.line_index.get(&(dest, origin.to_string())) {
            Some(&line) => {
                self.lines[line].highlighted = highlighted;
                true
            }
            None => false,
        }
    }

    /// One marker per located event place, in discovery order.
    pub fn event_markers(&self) -> Vec<MarkerSpec> {
        self.event_places
            .iter()
            .filter_map(|&lid| {
                let loc = &self.locations[lid.0 as usize];
                let (lat, lng) = (loc.lat?, loc.lng?);
                Some(MarkerSpec {
                    place: loc.place.clone(),
                    lat,
                    lng,
                    radius: self.options.marker_icon_size,
                    color: loc.color.clone(),
                    opacity: 1.0,
                    tooltip: join_text(&[&loc.place, ", ", &loc.title]),
                })
            })
            .collect()
    }

    /// One small marker per located delegate origin. The explicit sheet
    /// color wins over the configured origin marker color.
    pub fn origin_markers(&self) -> Vec<MarkerSpec> {
        self.origin_places
            .iter()
            .filter_map(|&lid| {
                let loc = &self.locations[lid.0 as usize];
                let (lat, lng) = (loc.lat?, loc.lng?);
                let color = if loc.color_override.is_empty() {
                    self.options.origin_marker_color.clone()
                } else {
                    loc.color_override.clone()
                };
                Some(MarkerSpec {
                    place: loc.place.clone(),
                    lat,
                    lng,
                    radius: self.options.origin_marker_icon_size,
                    color,
                    opacity: self.options.origin_marker_opacity,
                    tooltip: loc.place.clone(),
                })
            })
            .collect()
    }

    // ---- Timeline views ----

    /// Display state of every event column, in start order.
    pub fn timeline_columns(&self) -> Vec<ColumnState> {
        self.events
            .iter()
            .enumerate()
            .map(|(idx, event)| {
                let color = if event.shown {
                    self.locations[event.location.0 as usize].color.clone()
                } else {
                    "black".to_string()
                };
                ColumnState {
                    acronym: event.acronym.clone(),
                    column: idx,
                    label: self.event_label(event),
                    start: event.start_raw.clone(),
                    title: event.title.clone(),
                    filtered: event.filtered,
                    shown: event.shown,
                    highlighted: self.current == Some(idx),
                    color,
                    tooltip: join_text(&[
                        &event.acronym,
                        " ",
                        &format_time(event.start_time),
                    ]),
                }
            })
            .collect()
    }

    /// Year labels and event tick positions as ratios of the axis.
    ///
    /// Ticks may fall past 1.0 for events after the configured finish
    /// year; events before the start year have no tick at all.
    pub fn timeline_axis(&self) -> TimelineAxis {
        let start = self.options.start_time();
        let finish = self.options.finish_time();
        let mut labels: Vec<(i32, f64)> = Vec::new();
        if self.options.label_year > 0 && self.options.start_year < self.options.finish_year {
            let mut year = self.options.start_year;
            while year < self.options.finish_year {
                labels.push((
                    year,
                    map_range(
                        year as f64,
                        self.options.start_year as f64,
                        self.options.finish_year as f64,
                        0.0,
                        1.0,
                    ),
                ));
                year += self.options.label_year;
            }
        }

        let ticks: Vec<Option<f64>> = self
            .events
            .iter()
            .map(|event| {
                if start < finish && event.start_time >= start {
                    Some(map_range(
                        event.start_time as f64,
                        start as f64,
                        finish as f64,
                        0.0,
                        1.0,
                    ))
                } else {
                    None
                }
            })
            .collect();
        TimelineAxis { labels, ticks }
    }

    // ---- Menus and panes ----

    /// Event places with at least one event, sorted for a drop-down.
    pub fn location_choices(&self) -> Vec<String> {
        let mut places: Vec<String> = self
            .event_places
            .iter()
            .map(|&lid| self.locations[lid.0 as usize].place.clone())
            .collect();
        places.sort();
        places
    }

    /// Delegate origin places, sorted for a drop-down.
    pub fn origin_choices(&self) -> Vec<String> {
        let mut places: Vec<String> = self
            .origin_places
            .iter()
            .map(|&lid| self.locations[lid.0 as usize].place.clone())
            .collect();
        places.sort();
        places
    }

    /// Per-origin delegate counts of one event, sorted by origin name.
    pub fn country_summary(&self, acronym: &str) -> Vec<CountryCount> {
        let mut counts: Vec<CountryCount> = match self.find_event(acronym) {
            Some(idx) => self.events[idx]
                .countries
                .iter()
                .map(|c| CountryCount {
                    origin: c.origin.clone(),
                    count: c.delegates.len(),
                })
                .collect(),
            None => Vec::new(),
        };
        counts.sort_by(|a, b| a.origin.cmp(&b.origin));
        counts
    }

    /// Every delegate of one event, in join order grouped by origin.
    pub fn event_delegates(&self, acronym: &str) -> Vec<String> {
        match self.find_event(acronym) {
            Some(idx) => self.events[idx]
                .countries
                .iter()
                .flat_map(|c| c.delegates.iter().cloned())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Person cards for a list of UIDs, sorted by last name without
    /// regard to case. Unknown UIDs are dropped.
    pub fn people_menu(&self, uids: &[String]) -> Vec<PersonCard> {
        let mut menu: Vec<(String, PersonCard)> = uids
            .iter()
            .filter_map(|uid| {
                let person = &self.people[self.person_index.get(uid)?.0 as usize];
                Some((
                    person.last_name.to_lowercase(),
                    PersonCard {
                        uid: person.uid.clone(),
                        name: person.name.clone(),
                    },
                ))
            })
            .collect();
        menu.sort_by(|a, b| a.0.cmp(&b.0));
        menu.into_iter().map(|(_, card)| card).collect()
    }

    /// Everything the event pane shows, or None for an unknown acronym.
    pub fn event_details(&self, acronym: &str) -> Option<EventDetails> {
        let event = &self.events[self.find_event(acronym)?];
        let location = &self.locations[event.location.0 as usize];
        let label = self.event_label(event);
        let organiser_lines = match event.organiser {
            Some(oid) => self.entity_lines(
                &self.organisers[oid.0 as usize],
                SheetKind::Organisers,
            ),
            None => Vec::new(),
        };
        Some(EventDetails {
            acronym: event.acronym.clone(),
            full_title: join_text(&[
                &label,
                " ",
                &event.title,
                " - ",
                &location.place,
                " ",
                &event.start_raw,
                "-",
                &event.end_raw,
            ]),
            label,
            title: event.title.clone(),
            start: event.start_raw.clone(),
            place: location.place.clone(),
            event_lines: self.entity_lines(event, SheetKind::Events),
            location_lines: self.entity_lines(location, SheetKind::Locations),
            organiser_lines,
            countries: self.country_summary(acronym),
            delegates: self.event_delegates(acronym),
        })
    }

    /// Everything the person pane shows, or None for an unknown UID.
    pub fn person_details(&self, uid: &str) -> Option<PersonDetails> {
        let person = &self.people[self.person_index.get(uid)?.0 as usize];
        let events = person
            .attendance
            .iter()
            .filter_map(|attendance| {
                let event = &self.events[self.find_event(&attendance.acronym)?];
                let location = &self.locations[event.location.0 as usize];
                let label = self.event_label(event);
                Some(AttendanceDetail {
                    acronym: event.acronym.clone(),
                    header: join_text(&[&label, " ", &event.title]),
                    full_title: join_text(&[
                        &label,
                        " ",
                        &event.title,
                        " - ",
                        &location.place,
                        " ",
                        &event.start_raw,
                        "-",
                        &event.end_raw,
                    ]),
                    start: event.start_raw.clone(),
                    lines: self.entity_lines(attendance, SheetKind::PeopleAtEvents),
                })
            })
            .collect();
        Some(PersonDetails {
            uid: person.uid.clone(),
            name: person.name.clone(),
            role: person.field("Role").unwrap_or("").to_string(),
            lines: self.entity_lines(person, SheetKind::People),
            events,
        })
    }

    /// Extra field names seen so far on a sheet category.
    pub fn extra_field_names(&self, kind: SheetKind) -> &[String] {
        match self.extra_fields.get(&kind) {
            Some(names) => names,
            None => &[],
        }
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    // ---- Internals ----

    // First event with this acronym in current order, like the panes
    // resolve acronyms.
    fn find_event(&self, acronym: &str) -> Option<usize> {
        self.events.iter().position(|e| e.acronym == acronym)
    }

    // The organiser name stands in for the acronym unless acronyms are
    // forced or the organiser is unknown or unnamed.
    fn event_label(&self, event: &Event) -> String {
        if !self.options.acronyms {
            if let Some(oid) = event.organiser {
                let name = &self.organisers[oid.0 as usize].name;
                if !name.is_empty() {
                    return name.clone();
                }
            }
        }
        event.acronym.clone()
    }

    fn entity_lines<E: EntityFields>(&self, entity: &E, kind: SheetKind) -> Vec<FieldLine> {
        field_lines(entity, self.extra_field_names(kind))
    }

    fn located(&self, id: LocationId) -> bool {
        let loc = &self.locations[id.0 as usize];
        loc.lat.is_some() && loc.lng.is_some()
    }

    fn lat_lng(&self, id: LocationId) -> Option<(f64, f64)> {
        let loc = &self.locations[id.0 as usize];
        Some((loc.lat?, loc.lng?))
    }
}

// **** The comparison table ****

/// An ordered list of picked people, rendered against the event columns
/// for side-by-side comparison. Rows are independent of the filter.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct Sandbox {
    uids: Vec<String>,
}

impl Sandbox {
    pub fn new() -> Sandbox {
        Sandbox::default()
    }

    pub fn uids(&self) -> &[String] {
        &self.uids
    }

    /// Appends a person. Unknown UIDs and duplicates are ignored.
    pub fn add_person(&mut self, atlas: &Atlas, uid: &str) -> bool {
        if self.uids.iter().any(|u| u == uid) {
            return false;
        }
        if !atlas.person_index.contains_key(uid) {
            return false;
        }
        self.uids.push(uid.to_string());
        true
    }

    pub fn add_people(&mut self, atlas: &Atlas, uids: &[String]) {
        for uid in uids {
            self.add_person(atlas, uid);
        }
    }

    /// Applies one row operation to the row of `uid`. Returns false
    /// when the row is not in the table.
    pub fn move_row(&mut self, uid: &str, op: RowMove) -> bool {
        let pos = match self.uids.iter().position(|u| u == uid) {
            Some(p) => p,
            None => return false,
        };
        match op {
            RowMove::Top => {
                let row = self.uids.remove(pos);
                self.uids.insert(0, row);
            }
            RowMove::Bottom => {
                let row = self.uids.remove(pos);
                self.uids.push(row);
            }
            RowMove::Up => {
                if pos > 0 {
                    self.uids.swap(pos, pos - 1);
                }
            }
            RowMove::Down => {
                if pos + 1 < self.uids.len() {
                    self.uids.swap(pos, pos + 1);
                }
            }
            RowMove::Clear => {
                self.uids.remove(pos);
            }
            RowMove::ClearToBottom => {
                self.uids.truncate(pos);
            }
        }
        true
    }

    pub fn clear_all(&mut self) {
        self.uids.clear();
    }

    /// Renders the table against the current event order and map state.
    pub fn table(&self, atlas: &Atlas) -> SandboxTable {
        let columns: Vec<String> = atlas.events.iter().map(|e| e.acronym.clone()).collect();
        let rows = self
            .uids
            .iter()
            .filter_map(|uid| {
                let person = &atlas.people[atlas.person_index.get(uid)?.0 as usize];
                let cells = atlas
                    .events
                    .iter()
                    .map(|event| SandboxCell {
                        attended: person
                            .attendance
                            .iter()
                            .any(|a| a.acronym == event.acronym),
                        color: if event.shown {
                            atlas.locations[event.location.0 as usize].color.clone()
                        } else {
                            "black".to_string()
                        },
                    })
                    .collect();
                Some(SandboxRow {
                    uid: person.uid.clone(),
                    name: person.name.clone(),
                    role: person.field("Role").unwrap_or("").to_string(),
                    cells,
                })
            })
            .collect();
        SandboxTable { columns, rows }
    }
}

// **** Field handling ****

// Required field names are stored without their non-alphabetic
// characters, so `Last Name` is read back as `LastName`.
fn canonical_field(name: &str) -> String {
    name.chars().filter(|c| c.is_ascii_alphabetic()).collect()
}

// Missing cells are blank, a leading `!` blanks the value out, and
// everything else is trimmed. Applying this twice changes nothing.
fn copy_fields(field_map: &HashMap<String, usize>, row: &[String]) -> HashMap<String, String> {
    let mut fields = HashMap::new();
    for (name, &index) in field_map {
        let value = row.get(index).map(|v| v.as_str()).unwrap_or("");
        let value = if value.starts_with('!') { "" } else { value.trim() };
        fields.insert(name.clone(), value.to_string());
    }
    fields
}

fn field<'a>(fields: &'a HashMap<String, String>, name: &str) -> &'a str {
    fields.get(name).map(|v| v.as_str()).unwrap_or("")
}

/// Renders the extra fields of an entity into displayable lines, in the
/// cumulative order their names were first seen. Blank values are
/// skipped, image and link values are marked as such, and a field whose
/// header starts with `[` is emitted without a name.
fn field_lines<E: EntityFields>(entity: &E, names: &[String]) -> Vec<FieldLine> {
    let mut lines: Vec<FieldLine> = Vec::new();
    for name in names {
        let value = match entity.field(name) {
            Some(v) if !v.is_empty() => v,
            _ => continue,
        };
        if is_image_value(value) {
            lines.push(FieldLine {
                name: None,
                value: value.to_string(),
                kind: FieldKind::Image,
            });
            continue;
        }
        let kind = if value.starts_with("http://") || value.starts_with("https://") {
            FieldKind::Link
        } else {
            FieldKind::Text
        };
        lines.push(FieldLine {
            name: if name.as_str() < "[" {
                Some(name.clone())
            } else {
                None
            },
            value: value.to_string(),
            kind,
        });
    }
    lines
}

fn is_image_value(value: &str) -> bool {
    let lower = value.to_lowercase();
    let image = lower.ends_with(".png")
        || lower.ends_with(".jpg")
        || lower.ends_with(".jpeg")
        || lower.ends_with(".gif");
    image && !value.contains("#/media/File:")
}

// **** Label patterns ****

// Restricted glob over event labels: `*` and `?` are wildcards and
// every other character matches itself. Matches are unanchored. A blank
// pattern deactivates the term.
fn compile_pattern(pattern: &str) -> Option<Regex> {
    if pattern.is_empty() {
        return None;
    }
    let mut expr = String::new();
    for c in pattern.chars() {
        match c {
            '*' => expr.push_str(".*"),
            '?' => expr.push('.'),
            _ => expr.push_str(&regex::escape(&c.to_string())),
        }
    }
    Regex::new(&expr).ok()
}

// **** Dates ****

/// Best-effort timestamp for a start date, in milliseconds UTC.
///
/// Dates are tried day-first (`25/12/1999`, with an optional time),
/// then in ISO and month-name forms, then through a loose fallback that
/// inserts a month or day of 1 into a partial date. Anything else is
/// [`UNKNOWN_START`].
pub fn parse_start_time(raw: &str) -> i64 {
    let s = raw.trim();
    if s.is_empty() {
        return UNKNOWN_START;
    }

    const DAY_FIRST_TIMES: [&str; 2] = ["%d/%m/%Y %H:%M:%S", "%d/%m/%Y %H:%M"];
    for fmt in DAY_FIRST_TIMES {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return to_millis(dt);
        }
    }
    const DATES: [&str; 3] = ["%d/%m/%Y", "%Y-%m-%d", "%d %B %Y"];
    for fmt in DATES {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return date_millis(d);
        }
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return to_millis(dt);
    }
    // Year-month and month-year forms, completed with day 1.
    if let Ok(d) = NaiveDate::parse_from_str(&format!("{}-1", s), "%Y-%m-%d") {
        return date_millis(d);
    }
    if let Ok(d) = NaiveDate::parse_from_str(&format!("1 {}", s), "%d %B %Y") {
        return date_millis(d);
    }
    if let Ok(year) = s.parse::<i32>() {
        if (1000..=9999).contains(&year) {
            return year_start_millis(year);
        }
    }
    // Loose fallback: the first date separator becomes a lone 1, so
    // `3 1921` reads as March 1 1921 and `1921-3` as Jan 3 1921.
    if let Some(pos) = s.find(['/', ' ', '-']) {
        let loose = format!("{}/1/{}", &s[..pos], &s[pos + 1..]);
        for fmt in ["%m/%d/%Y", "%Y/%m/%d"] {
            if let Ok(d) = NaiveDate::parse_from_str(&loose, fmt) {
                return date_millis(d);
            }
        }
    }
    UNKNOWN_START
}

fn date_millis(date: NaiveDate) -> i64 {
    match date.and_hms_opt(0, 0, 0) {
        Some(dt) => to_millis(dt),
        None => UNKNOWN_START,
    }
}

fn to_millis(dt: NaiveDateTime) -> i64 {
    Utc.from_utc_datetime(&dt).timestamp_millis()
}

/// Formats a timestamp as a day/month/year date, or blank when the
/// time is unknown or out of range.
pub fn format_time(time: i64) -> String {
    if time == UNKNOWN_START {
        return String::new();
    }
    match Utc.timestamp_millis_opt(time).single() {
        Some(dt) => dt.format("%-d/%-m/%Y").to_string(),
        None => String::new(),
    }
}

/// Moves a timestamp by whole steps of a unit. Year and month steps use
/// calendar arithmetic; the rest are fixed-width.
pub fn step_time(time: i64, step: TimeStep, steps: i64) -> i64 {
    match step {
        TimeStep::Year | TimeStep::Month => {
            let months = match step {
                TimeStep::Year => steps.saturating_mul(12),
                _ => steps,
            };
            let dt = match Utc.timestamp_millis_opt(time).single() {
                Some(dt) => dt,
                None => return time,
            };
            let shifted = if months >= 0 {
                dt.checked_add_months(Months::new(months.min(u32::MAX as i64) as u32))
            } else {
                dt.checked_sub_months(Months::new((-months).min(u32::MAX as i64) as u32))
            };
            match shifted {
                Some(dt) => dt.timestamp_millis(),
                None => time,
            }
        }
        _ => time.saturating_add(step.millis().saturating_mul(steps)),
    }
}

// **** Small numeric helpers ****

pub fn clamp_range(x: f64, min: f64, max: f64) -> f64 {
    x.max(min).min(max)
}

pub fn map_range(x: f64, from_min: f64, from_max: f64, to_min: f64, to_max: f64) -> f64 {
    (x - from_min) * (to_max - to_min) / (from_max - from_min) + to_min
}

/// Joins alternating items and separators, dropping blank items along
/// with their separators. A separator is kept only when the item after
/// it is non-blank, so `["A", ", ", ""]` gives just `A`.
pub fn join_text(parts: &[&str]) -> String {
    let mut text = String::new();
    let mut index = 0;
    while index < parts.len() {
        let item = parts[index];
        if !item.is_empty() {
            text.push_str(item);
            let next = parts.get(index + 2).copied().unwrap_or("");
            if !next.is_empty() {
                if let Some(sep) = parts.get(index + 1) {
                    text.push_str(sep);
                }
            }
        }
        index += 2;
    }
    text
}

/// Maps a ratio in [0, 1] onto a red-to-magenta rainbow, as a lowercase
/// `#rrggbb` string.
///
/// The scale runs through six 256-shade sections (red, yellow, green,
/// cyan, blue, magenta); 0 is pure red and 1 wraps to magenta.
pub fn rainbow_color(ratio: f64) -> String {
    let scale = (ratio * 6.0 * 256.0).floor() as i64;
    let section = scale.div_euclid(256).rem_euclid(6) as usize;
    let shade = scale.rem_euclid(256);
    let range: [[i64; 3]; 6] = [
        [255, 0, -1],
        [255, 1, 0],
        [-1, 255, 0],
        [0, 255, 1],
        [0, -1, 255],
        [1, 0, 255],
    ];
    let mut rgb = [0i64; 3];
    for (slot, role) in rgb.iter_mut().zip(range[section]) {
        *slot = match role {
            -1 => 255 - shade,
            1 => shade,
            fixed => fixed,
        };
    }
    format!("#{:06x}", (rgb[0] * 256 + rgb[1]) * 256 + rgb[2])
}
