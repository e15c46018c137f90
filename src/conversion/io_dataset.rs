// Writer for the dataset.

use crate::conversion::*;

pub const DATASET_HEADER: [&str; 11] = [
    "Sport",
    "First Name",
    "Last Name",
    "Gender",
    "Date of Birth",
    "Year",
    "Program",
    "Full_Name",
    "CSS",
    "Years_Targeted",
    "Convert_Year",
];

fn row_fields(r: &DatasetRow) -> Vec<String> {
    vec![
        r.sport.clone(),
        r.first_name.clone(),
        r.last_name.clone(),
        r.gender.clone().unwrap_or_default(),
        r.date_of_birth.clone().unwrap_or_default(),
        r.year.to_string(),
        r.program.clone().unwrap_or_default(),
        r.full_name.clone(),
        if r.css { "YES" } else { "NO" }.to_string(),
        r.years_targeted.to_string(),
        r.convert_year.as_str().to_string(),
    ]
}

/// Renders the dataset as CSV, with a header row.
pub fn render_dataset(rows: &[DatasetRow]) -> RunResult<String> {
    let mut buf: Vec<u8> = Vec::new();
    {
        let mut wtr = csv::Writer::from_writer(&mut buf);
        wtr.write_record(DATASET_HEADER).context(CsvWriteSnafu {})?;
        for r in rows.iter() {
            wtr.write_record(row_fields(r)).context(CsvWriteSnafu {})?;
        }
        wtr.flush().context(WritingFileSnafu { path: "dataset" })?;
    }
    String::from_utf8(buf).whatever_context("The dataset is not valid UTF-8")
}
