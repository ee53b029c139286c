/*!

This is the long-form manual for `event_atlas` and `evatlas`.

## The document

All the data of a viewer lives in one document made of named sheets.
The usual source is a spreadsheet (one worksheet per sheet), but the
command line tool also accepts a directory of CSV files or a JSON file
per sheet. The sheets are read in a fixed order, because later sheets
refer to entities declared by earlier ones:

| Sheet | Required fields | Optional fields | Role |
|----------------|--------------------------------|----------------|------|
| Parameters | `Parameter`, `Value` | | viewer configuration |
| Locations | `Place`, `Lat`, `Lng` | `Title`, `Color` | the places of the map |
| Organisers | `Name` | | bodies that organise events |
| Events | `Acronym` | `Title` | the events themselves |
| People | `UID`, `Last Name`, `First Name` | | the delegates |
| PeopleAtEvents | `UID`, `Acronym` | | who attended what |

The `Organisers` sheet may be missing altogether. Any other missing
sheet produces a diagnostic message but never stops the viewer: it
shows whatever could be read.

## Field rules

The first row of every sheet is its header. A header cell is a field
name when its first character is an uppercase letter (or `[`, see
below); anything else, including lowercase names and blank cells, is
invisible to the viewer and can be used for private notes.

Every required field must be present exactly once, otherwise the whole
sheet is rejected with a message such as:

```text
People sheet missing fields ["UID","Last Name","First Name"]
```

Required names are looked up without their spaces, so the `Last Name`
column is carried as the `LastName` field of a person.

Recognized fields that are neither required nor optional are *extra
fields*. They are kept with each record and rendered, in the order the
columns first appeared, in the detail panes. Some extra fields have a
conventional meaning on top of that: `Start`, `End`, `Location` and
`Organiser` on events, `Origin` and `Role` on people.

Cell values are trimmed. A value starting with `!` reads as blank,
which hides one cell from the viewer without deleting it. In the panes, a value ending in `.png`, `.jpg`, `.jpeg`
or `.gif` renders as an image, a value starting with `http://` or
`https://` as a link, and a field whose header starts with `[` is
printed without its name.

## Parameters

Each row of the `Parameters` sheet sets one option. The value is a
number, a flag (`true`/`false`/`on`/`off`/any number) or text,
depending on the parameter:

| Parameter | Default | Meaning |
|----------------------|-------------|---------|
| `title` | Event Viewer | title of the viewer |
| `markerIconSize` | 4 | radius of event markers |
| `originMarkerIconSize` | 1 | radius of origin markers |
| `originMarkerColor` | #aaaaaa | color of origin markers |
| `originMarkerOpacity` | 0.8 | opacity of origin markers |
| `initLat` | 51.4513915 | initial map latitude |
| `initLng` | -2.5982592 | initial map longitude |
| `initZoom` | 2 | initial map zoom |
| `startYear` | 1900 | first year of the timeline axis |
| `finishYear` | 2100 | first year past the timeline axis |
| `labelYear` | 50 | years between axis labels |
| `linkWidth` | 2 | width of link decorations |
| `lineOpacity` | 0.5 | opacity of attendance lines |
| `lineMinWidth` | 2 | thinnest attendance line |
| `lineMaxWidth` | 17 | thickest attendance line |
| `timeline` | 1 | show the timeline |
| `acronyms` | 0 | label events by acronym even when an organiser is known |

A parameter that is not in this table is kept verbatim and handed to
the host application, so a web front end can read its own keys (tile
layers, panel colors and so on) from the same sheet.

## Locations and colors

A place used by events gets a color from a rainbow scale, in the order
the places are first referenced by the `Events` sheet. The `Color`
field overrides the scale for that place. Markers, attendance lines
and timeline columns all reuse the color of the place.

`Lat` and `Lng` must be decimal degrees. A place whose coordinates do
not parse still exists for the menus and the counts; it simply draws
nothing on the map.

## Events and attendance

An event row with a blank `Acronym` is skipped. The `Location` must
name a `Place` from the Locations sheet, otherwise the event is
dropped with a message. `Start` accepts a day-first date such as
`25/12/1999` (with an optional time), an ISO date, `December 1999`,
a bare year, and a few looser forms; an unreadable date sorts the
event before all dated ones and leaves it out of any date filter.

Each `PeopleAtEvents` row joins one person (`UID`) to one event
(`Acronym`). When the person has an `Origin` naming a located place,
the join also feeds the attendance line from that origin to the event
place. The thickness of a line follows its delegate count, clamped
between `lineMinWidth` and `lineMaxWidth`.

## Filtering

Four filter terms restrict the events; a blank term accepts
everything, and an event must pass all four:

* a label pattern, where `*` matches any run of characters and `?` a
  single one. The match is on the displayed label and is unanchored,
  so `congress*` finds `World congress 1950`.
* a date range, inclusive on both ends, active while start < finish.
* a `|`-separated set of event places, such as `Paris|Lyon`.
* a `|`-separated set of delegate origins. An event passes when any of
  its delegates comes from one of the origins.

Membership in the `|` sets is on whole names: `Paris` does not match
`Paris North`.

*/
