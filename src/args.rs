use clap::Parser;

/// This is a map viewer and data checker for series of events.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file or directory path) The document with the viewer data. For the xlsx input type this
    /// is the spreadsheet file; for the csv and json types it is a directory holding one
    /// file per sheet (Locations.csv, Events.csv, ...).
    #[clap(short, long, value_parser)]
    pub input: String,

    /// (default xlsx) The type of the input: xlsx, csv or json. See documentation for the
    /// layout expected of each type.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// (key=value, may be repeated) Overrides one parameter of the document, with the same keys
    /// as the Parameters sheet. Overrides are applied after that sheet is read.
    #[clap(short, long, value_parser)]
    pub param: Option<Vec<String>>,

    /// (pattern or empty) Keeps only the events whose label matches the pattern. `*` matches any
    /// run of characters and `?` exactly one; anything else matches itself.
    #[clap(long, value_parser)]
    pub event_pattern: Option<String>,

    /// (date or empty) Lower bound of the date filter, inclusive, in the formats accepted by the
    /// Start field of events. Alone, it keeps every dated event from that date onwards.
    #[clap(long, value_parser)]
    pub start: Option<String>,

    /// (date or empty) Upper bound of the date filter, inclusive.
    #[clap(long, value_parser)]
    pub finish: Option<String>,

    /// (|-separated list or empty) Keeps only the events held at one of these places.
    #[clap(long, value_parser)]
    pub locations: Option<String>,

    /// (|-separated list or empty) Keeps only the events with delegates from one of these
    /// origin places.
    #[clap(long, value_parser)]
    pub origins: Option<String>,

    /// If passed as an argument, every event passing the filter is shown on the map before the
    /// summary is assembled. Without it the map starts empty, like the viewer does.
    #[clap(long, takes_value = false)]
    pub show_all: bool,

    /// (file path, 'stdout' or empty) If specified, the summary of the viewer state will be
    /// written in JSON format to the given location instead of the standard output.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path) A reference file containing a viewer summary in JSON format. If provided,
    /// evatlas will check that the computed summary matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
