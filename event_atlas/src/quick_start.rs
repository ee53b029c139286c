/*!

# Quick start with Google Sheets

This example shows you how to build a viewer document end to end,
using an online spreadsheet to hold the data. This example uses Google
Sheets because it is free to use and easy to share with the people
maintaining the data. Other providers (Microsoft, LibreOffice on your
own computer) work the same way.

We would like to map three congresses and the delegates who attended
them. To do that, create a new spreadsheet with one worksheet per
sheet of the document, named `Parameters`, `Locations`, `Organisers`,
`Events`, `People` and `PeopleAtEvents`.

**Locations** List every place you will refer to, with decimal
coordinates:

```text
Place       Lat        Lng       Title
Paris       48.8566    2.3522    Palais de la Mutualité
London      51.5072    -0.1276
Algiers     36.7538    3.0588
```

**Events** One row per event. `Location` must match a `Place` from the
previous worksheet:

```text
Acronym   Title              Start        End          Location   Organiser
C1945     First Congress     25/9/1945    3/10/1945    London     WFTU
C1949     Second Congress    29/6/1949    10/7/1949    Paris      WFTU
```

**People and attendance** `People` declares the delegates, with an
optional `Origin` naming one of the places. `PeopleAtEvents` has one
row per attendance:

```text
UID    Last Name    First Name    Origin
p1     Dupont       Marie         Paris
p2     Smith        John          London

UID    Acronym
p1     C1945
p1     C1949
p2     C1949
```

Download the spreadsheet on your computer in the **Excel format**
(xlsx), then run `evatlas` on it:

```bash
evatlas -i congresses.xlsx
```

The program replays the sheets, prints any data problem it finds and
writes a JSON summary of the viewer state to the standard output:

```text
[2023-03-02T10:12:41Z INFO  event_atlas] finalize: 2 events at 2 locations, 2 people, 2 attendance lines
```

Anything wrong with the data shows up in the `messages` part of the
summary (and on the console with `--verbose`), for example:

```text
Unknown location Lisboa for C1953
People Origin: Marseille not in Locations
```

Fix the named worksheet, download and run again.

**Filtering** The summary can be restricted to part of the data with
the filter flags, which mirror the filter controls of the viewer:

```bash
evatlas -i congresses.xlsx --event-pattern 'C19*' \
  --start 1/1/1945 --finish 31/12/1950 \
  --origins 'Paris|London' --show-all --out state.json
```

`--out` writes the summary to a file instead of the standard output.
A web front end can load that file directly as its initial state.

If your data is not in a spreadsheet, the same document can be read
from a directory of CSV files (one `<Sheet>.csv` per worksheet, with
`--input-type csv`) or from JSON tables (`--input-type json`). See the
input documentation page for the details.

*/
