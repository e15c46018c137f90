// Reader for the historical conversion records.

use crate::conversion::io_common::{cell, make_record, RecordColumns, Table};
use crate::conversion::*;

pub fn read_conversion(table: &Table) -> RunResult<SourceRead> {
    let cols = RecordColumns::find(table, "Gender", "Date of Birth", "Year", "Program")?;
    debug!("read_conversion: columns: {:?}", cols);
    let mut res = SourceRead::new();
    for (idx, row) in table.rows.iter().enumerate() {
        match make_record(
            table,
            idx,
            row,
            &cols,
            SourceKind::Conversion,
            cell(row, cols.year),
            false,
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
    fn reads_conversion_rows() {
        let data = "\
Sport,First Name,Last Name,Gender,Date of Birth,Year,Program
Rowing,Jon,Smith,M,2004-05-17,2021,Uncarded
Rowing,Jon,Smith,M,2004-05-17,2022.0,SC Carded
,Ana,Lopez,F,,2021,Prov Dev 3
Rowing,Ana,Lopez,F,,unknown,Prov Dev 3
Judo,Kim,Lee,,,2021,
";
        let table = read_csv_table("conversion.csv", data.as_bytes(), 0).unwrap();
        let res = read_conversion(&table).unwrap();
        assert_eq!(res.records.len(), 3);
        assert_eq!(res.skipped, 2);
        assert_eq!(res.records[1].year, 2022);
        assert_eq!(res.records[0].program_level, Some("Uncarded".to_string()));
        assert_eq!(res.records[0].date_of_birth, Some("2004-05-17".to_string()));
        assert_eq!(res.records[2].program_level, None);
        assert_eq!(res.records[2].gender, None);
        assert!(res.records.iter().all(|r| !r.css_flag));
    }

    #[test]
    fn missing_required_column_fails() {
        let data = "Sport,First Name,Last Name,Program\nRowing,Jon,Smith,Uncarded\n";
        let table = read_csv_table("conversion.csv", data.as_bytes(), 0).unwrap();
        assert!(matches!(
            read_conversion(&table),
            Err(RunError::MissingColumn { .. })
        ));
    }
}
