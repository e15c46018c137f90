// Reader for the nomination roster.

use athlete_timeline::level::is_retired_label;

use crate::conversion::io_common::{cell, make_record, opt_cell, RecordColumns, Table};
use crate::conversion::*;

/// The CSS markers of a nomination row.
fn is_css_nomination(sport_level: Option<&str>, nominating_body: Option<&str>) -> bool {
    let by_level = sport_level
        .map(|s| s.trim().eq_ignore_ascii_case("CSS"))
        .unwrap_or(false);
    let by_body = nominating_body
        .map(|b| {
            let upper = b.trim().to_uppercase();
            upper == "CSS" || upper.contains("CANADIAN SPORT SCHOOL")
        })
        .unwrap_or(false);
    by_level || by_body
}

pub fn read_nomination(table: &Table) -> RunResult<SourceRead> {
    let cols = RecordColumns::find(
        table,
        "Sex Of Competition",
        "DOB",
        "Fiscal Year",
        "Carding Level",
    )?;
    let profile_type = table.column("Profile Type");
    let sport_level = table.column("SportLevel");
    let nominating_body = table.column("Nominating Body");
    debug!(
        "read_nomination: columns: {:?}, profile type: {:?}",
        cols, profile_type
    );

    let mut res = SourceRead::new();
    for (idx, row) in table.rows.iter().enumerate() {
        if let Some(p) = profile_type {
            if !cell(row, p).eq_ignore_ascii_case("Athlete") {
                res.excluded += 1;
                continue;
            }
        }
        if let Some(level) = opt_cell(row, cols.level) {
            if is_retired_label(&level) {
                debug!(
                    "read_nomination: {:?} line {}: retired, excluded",
                    table.path,
                    table.lineno(idx)
                );
                res.excluded += 1;
                continue;
            }
        }
        let css = is_css_nomination(
            sport_level.map(|i| cell(row, i)),
            nominating_body.map(|i| cell(row, i)),
        );
        match make_record(
            table,
            idx,
            row,
            &cols,
            SourceKind::Nomination,
            cell(row, cols.year),
            css,
        ) {
            Some(r) => res.records.push(r),
            None => res.skipped += 1,
        }
    }
    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversion::io_common::read_csv_table;

    #[test]
    fn reads_nominations() {
        let data = "\
Sport,First Name,Last Name,Sex Of Competition,DOB,Fiscal Year,Carding Level,Nominating Body,SportLevel,Profile Type
Rowing,Jon,Smith,M,2004-05-17,2025-26,SR1,Rowing Canada,,Athlete
Rowing,Ana,Lopez,F,,2026,Prov Dev 2,Canadian Sport School Ontario,,Athlete
Rowing,Kim,Lee,F,,2026,Uncarded,,CSS,Athlete
Rowing,Bob,Ray,M,,2026,GamePlan Retired,,,Athlete
Rowing,Sam,Coach,M,,2026,,,,Coach
";
        let table = read_csv_table("nomination.csv", data.as_bytes(), 0).unwrap();
        let res = read_nomination(&table).unwrap();
        assert_eq!(res.records.len(), 3);
        assert_eq!(res.excluded, 2);
        let jon = &res.records[0];
        assert_eq!(jon.year, 2026);
        assert_eq!(jon.gender, Some("M".to_string()));
        assert_eq!(jon.date_of_birth, Some("2004-05-17".to_string()));
        assert_eq!(jon.program_level, Some("SR1".to_string()));
        assert!(!jon.css_flag);
        assert!(res.records[1].css_flag);
        assert!(res.records[2].css_flag);
    }

    #[test]
    fn css_markers() {
        assert!(is_css_nomination(Some("css"), None));
        assert!(is_css_nomination(None, Some(" CSS ")));
        assert!(is_css_nomination(None, Some("Canadian Sport School Calgary")));
        assert!(!is_css_nomination(Some("NextGen"), Some("Canadian Sport Institute")));
        assert!(!is_css_nomination(None, None));
    }
}
