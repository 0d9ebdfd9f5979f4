/*!

This is the long-form manual for `proximity_divergence` and the `polldiff` programs.

## Pipeline

The analysis runs in two batch steps, connected by a spreadsheet:

1. `polldiff-detect` reads the table of polling stations, compares every pair of
   stations and writes the pairs that are close to each other but report different
   results.
2. `polldiff-map` reads that table back, together with the original table, and
   writes an HTML map with one marker per station and one line per pair.

## Input table

One row per polling station. The following columns are expected (the names can be
changed in the configuration file):

* `lat`, `lng` position in decimal degrees
* `percentage` the result share, as a fraction between 0 and 1
* `address_1`, `address_2`, `address_3` free text, copied to the output

Rows with a missing, non-numeric or out of range position or percentage are
rejected before the comparison. The number of rejected rows is reported for each
column.

Each row is identified by its position in the table: the first row after the header
is record `1`.

## Thresholds

* `proximityThresholdKm` (default `1`): two stations are close when at most this
  many kilometers apart (great-circle distance on a sphere of radius 6371 km).
* `percentageDiffThreshold` (default `10`): in percentage points. With the default,
  a pair is flagged when the shares differ by 0.10 or more.

Both bounds are inclusive.

## Pair table

Written as `.xlsx` (or `.csv` when the output path ends with `.csv`). The columns are:

| Column | Content |
|---|---|
| `Address 1`, `Address 2` | position of each station, as text: `(41.7151, 44.8271)` |
| `Distance (km)` | great-circle distance |
| `Percentage Difference (%)` | in percentage points |
| `Percentage 1`, `Percentage 2` | the original shares, in percentage points |
| `Address 1 - Part 1` ... `Address 2 - Part 3` | the address fields |
| `Record 1 ID`, `Record 2 ID` | row number of each station in the input table |
| `addr1_lat`, `addr1_lon`, `addr2_lat`, `addr2_lon` | position of each station, as numbers |
| `Schema Version` | `2` |

Tables written by older tools only carry the first twelve columns. The map program
still accepts them: the positions are then read from the text columns. The text may
wrap each number in a type tag, as in `(np.float64(41.7151), np.float64(44.8271))`.

## Configuration file

Both programs accept `--config path/to/config.json`:

```json
{
  "recordsPath": "2024_parliamentary_round_1_proportional_electronic.xlsx",
  "pairsPath": "close_address_pairs_with_high_percentage_difference.xlsx",
  "mapPath": "map.html",
  "proximityThresholdKm": 1,
  "percentageDiffThreshold": 10,
  "columns": {
    "latitude": "lat",
    "longitude": "lng",
    "percentage": "percentage",
    "address": ["address_1", "address_2", "address_3"]
  },
  "map": { "zoom": 10, "layerName": "Address Pairs" }
}
```

All the keys are optional. Relative paths are resolved against the directory of the
configuration file. Command line flags take precedence over the file.
*/
