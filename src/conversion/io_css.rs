// Readers for the CSS roster, in its long and wide layouts.

use crate::conversion::io_common::{cell, make_record, RecordColumns, Table};
use crate::conversion::*;

/// True for the rows the roster counts: an enrolled class and a real level.
fn is_enrolled(level: &str, class: &str) -> bool {
    class.eq_ignore_ascii_case("YES") && !level.is_empty() && !level.eq_ignore_ascii_case("X")
}

pub fn read_css_long(table: &Table) -> RunResult<SourceRead> {
    let cols = RecordColumns::find(table, "Gender", "Date of Birth", "Year", "Level")?;
    let class_idx = table.require("Class")?;
    let mut res = SourceRead::new();
    for (idx, row) in table.rows.iter().enumerate() {
        let level = cols.level.map(|i| cell(row, i)).unwrap_or("");
        if !is_enrolled(level, cell(row, class_idx)) {
            debug!(
                "read_css_long: {:?} line {}: not enrolled, excluded",
                table.path,
                table.lineno(idx)
            );
            res.excluded += 1;
            continue;
        }
        match make_record(
            table,
            idx,
            row,
            &cols,
            SourceKind::CssRoster,
            cell(row, cols.year),
            true,
        ) {
            Some(r) => res.records.push(r),
            None => res.skipped += 1,
        }
    }
    Ok(res)
}

/// A season column pair of the wide roster.
#[derive(Eq, PartialEq, Debug, Clone)]
struct SeasonColumns {
    year: i32,
    level: usize,
    class: usize,
}

/// Reads a `YY/YY` season label. The season is recorded as 2000 + its second year.
fn season_year(season: &str) -> Option<i32> {
    match season.trim().split('/').collect::<Vec<&str>>().as_slice() {
        [a, b]
            if a.len() == 2
                && b.len() == 2
                && a.chars().all(|c| c.is_ascii_digit())
                && b.chars().all(|c| c.is_ascii_digit()) =>
        {
            b.parse::<i32>().ok().map(|y| 2000 + y)
        }
        _ => None,
    }
}

fn season_columns(table: &Table) -> Vec<SeasonColumns> {
    let mut res: Vec<SeasonColumns> = Vec::new();
    for (level_idx, h) in table.header.iter().enumerate() {
        let lower = h.to_lowercase();
        let season = match lower.strip_suffix("level") {
            Some(s) => s.trim(),
            None => continue,
        };
        let year = match season_year(season) {
            Some(y) => y,
            None => continue,
        };
        match table.column(&format!("{} Class", season)) {
            Some(class_idx) => res.push(SeasonColumns {
                year,
                level: level_idx,
                class: class_idx,
            }),
            None => warn!(
                "season_columns: {:?}: no class column for {:?}, ignored",
                table.path, h
            ),
        }
    }
    res
}

/// Reads the wide roster: one row per athlete, one Level/Class column pair per season.
pub fn read_css_wide(table: &Table) -> RunResult<SourceRead> {
    let seasons = season_columns(table);
    if seasons.is_empty() {
        whatever!("No season columns (\"YY/YY Level\") in {}", table.path)
    }
    debug!("read_css_wide: seasons: {:?}", seasons);
    let sport = table.require("Sport")?;
    let first_name = table.require("First Name")?;
    let last_name = table.require("Last Name")?;
    let mut res = SourceRead::new();
    for (idx, row) in table.rows.iter().enumerate() {
        for season in seasons.iter() {
            let level = cell(row, season.level);
            if !is_enrolled(level, cell(row, season.class)) {
                res.excluded += 1;
                continue;
            }
            // The season replaces the year column.
            let cols = RecordColumns {
                sport,
                first_name,
                last_name,
                gender: table.column("Gender"),
                date_of_birth: table.column("Date of Birth"),
                year: season.level,
                level: Some(season.level),
            };
            let year = season.year.to_string();
            match make_record(table, idx, row, &cols, SourceKind::CssRoster, &year, true) {
                Some(r) => res.records.push(r),
                None => res.skipped += 1,
            }
        }
    }
    Ok(res)
}
