/*!

This is the long-form manual for `athlete_timeline` and `convtrack`.

## What it builds

`convtrack` merges three rosters of targeted athletes into one dataset with one row per
athlete, sport and year. Each row carries two metrics:

* `Years_Targeted`: the number of distinct years the athlete appears in that sport.
  It is the same on every row of the athlete.
* `Convert_Year`: `Y` when the program level of that year is strictly higher than the
  level of the preceding recorded year, `N` otherwise. The first year is always `N`.

## Input formats

The following sources are supported:
* `conversion` historical conversion records
* `css` the CSS participation roster, one row per athlete and year
* `css_wide` the CSS participation roster with one column pair per year
* `nomination` the nomination roster

Files ending in `.xlsx`, `.xlsm` or `.xls` are read as Excel workbooks (first sheet, or the
sheet named by `excelWorksheetName`). Any other file is read as CSV with a header row.
Column names are matched after trimming, case-insensitively.

### `conversion`

```text
Sport,First Name,Last Name,Gender,Date of Birth,Year,Program
Rowing,Jon,Smith,M,2004-05-17,2021,Uncarded
```

### `css`

Only rows with `Class` equal to `YES` are kept. Rows with an empty `Level` or `X` are dropped.

```text
Sport,First Name,Last Name,Gender,Date of Birth,Year,Level,Class
Rowing,John,Smith,M,2004-05-17,2022,SC Carded,YES
```

### `css_wide`

The same roster with one pair of columns per season. `skipRows` leading rows are ignored
before the header. A season `23/24` is recorded as year 2024.

|Sport |First Name|Last Name|23/24 Level|23/24 Class|24/25 Level|24/25 Class|
|------|----------|---------|-----------|-----------|-----------|-----------|
|Rowing|John      |Smith    |Uncarded   |YES        |SC Carded  |YES        |

### `nomination`

```text
Sport,First Name,Last Name,Sex Of Competition,DOB,Fiscal Year,Carding Level,Nominating Body,SportLevel,Profile Type
```

Only `Athlete` profiles are kept when a `Profile Type` column is present. Rows with the
level `GamePlan Retired` are dropped. A row is marked CSS when `SportLevel` is `CSS`, or
when `Nominating Body` is `CSS` or mentions `Canadian Sport School`.

### Years

Year cells may be written `2024`, `2024.0`, or as a fiscal span `2024-25`, `2024/2025`,
`24/25`. Spans are recorded as their later year.

## Program levels

The levels are ordered:

`Prov Dev 3` < `Prov Dev 2` < `Prov Dev 1` < `Uncarded` < `SC Carded`

The following aliases are accepted: `PD3`, `PD2`, `PD1` and, for `SC Carded`, `D`, `DI`,
`SR`, `SR1`, `SR2`, `SRI`, `C1`. Any other label (for example `Non-Targeted`) is kept in
the dataset as written, but no transition involving it is ever counted as a conversion.
These transitions are listed in the run summary.

## Name consolidation

Within a sport, names are normalized (letters and digits only, lowercase) and compared
with the normalized Levenshtein similarity. Pairs scoring at least `similarityThreshold`
are merged, transitively. The most frequent spelling becomes the canonical name. Names
are only compared within a block sharing the first `blockingPrefixLength` characters of the
normalized last name. Spellings with the same normalized name (`Mary Kate-Smith` and
`Mary Kate Smith`) are always one athlete, whatever their blocks.

Pairs scoring just below the threshold (within `ambiguityMargin`) are not merged but
listed in the summary for review.

The same name in two sports is two different athletes, unless `linkAcrossSports` is set
and both records carry the same date of birth. When one sport holds two such athletes,
nothing is linked and the group is listed under `crossSportAmbiguities`.

## Configuration

```json
{
  "outputSettings": {
    "datasetPath": "dataset.csv",
    "summaryPath": "summary.json"
  },
  "sources": [
    { "provider": "conversion", "filePath": "conversion.csv" },
    { "provider": "css_wide", "filePath": "css.xlsx", "excelWorksheetName": "Roster", "skipRows": 2 },
    { "provider": "nomination", "filePath": "nominations.csv" }
  ],
  "rules": {
    "similarityThreshold": 0.85,
    "ambiguityMargin": 0.05,
    "blockingPrefixLength": 3,
    "blockingStrategy": "lastName",
    "convertRule": "precedingYear",
    "linkAcrossSports": false
  }
}
```

Sources are merged in the order they are listed. When two sources give levels that
cannot be ordered for the same year, the first one listed wins.

Relative paths are resolved against the directory of the configuration file. Every
setting may also be given on the command line, see `convtrack --help`.
*/
