#![forbid(unsafe_code)]

//! CSV loading for the status and duration tables.
//!
//! Both files carry a header row whose first column is the run id and whose
//! remaining columns are test case names, e.g. as written by a dataframe
//! export:
//!
//! ```text
//! ,translations,test:linux
//! 0,True,False
//! 1,True,True
//! ```

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{Result, TtffError};
use crate::matrix::RunMatrix;

struct RawTable {
    cases: Vec<String>,
    run_ids: Vec<String>,
    cells: Vec<Vec<String>>,
}

fn read_table<R: Read>(reader: R, table: &'static str) -> Result<RawTable> {
    let mut csv = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv.headers()?.clone();
    let cases: Vec<String> = headers.iter().skip(1).map(ToOwned::to_owned).collect();

    let mut run_ids = Vec::new();
    let mut cells = Vec::new();
    for record in csv.records() {
        let record = record?;
        let mut fields = record.iter();
        let run_id = fields.next().unwrap_or_default().to_string();
        let row: Vec<String> = fields.map(ToOwned::to_owned).collect();
        if row.len() != cases.len() {
            return Err(TtffError::shape(format!(
                "{table} table run {run_id}: {} cells for {} test cases",
                row.len(),
                cases.len()
            )));
        }
        run_ids.push(run_id);
        cells.push(row);
    }

    Ok(RawTable {
        cases,
        run_ids,
        cells,
    })
}

fn parse_status(raw: &str) -> Option<bool> {
    match raw {
        "True" | "true" | "TRUE" | "1" => Some(true),
        "False" | "false" | "FALSE" | "0" => Some(false),
        _ => None,
    }
}

/// Parse both tables and align them into a [`RunMatrix`].
///
/// The tables must share the same header and the same run-id column, in
/// the same order.
pub fn load_tables<S: Read, D: Read>(statuses: S, durations: D) -> Result<RunMatrix> {
    let status_table = read_table(statuses, "status")?;
    let duration_table = read_table(durations, "duration")?;

    if status_table.cases != duration_table.cases {
        return Err(TtffError::shape(format!(
            "status table has {} test case columns, duration table has {} (headers differ)",
            status_table.cases.len(),
            duration_table.cases.len()
        )));
    }
    if status_table.run_ids != duration_table.run_ids {
        return Err(TtffError::shape(format!(
            "status table has {} runs, duration table has {} (run ids differ)",
            status_table.run_ids.len(),
            duration_table.run_ids.len()
        )));
    }

    let cases = status_table.cases;
    let run_ids = status_table.run_ids;

    let mut status_rows = Vec::with_capacity(run_ids.len());
    for (run_id, row) in run_ids.iter().zip(&status_table.cells) {
        let parsed = row
            .iter()
            .zip(&cases)
            .map(|(raw, case)| {
                parse_status(raw).ok_or_else(|| TtffError::InvalidCell {
                    table: "status",
                    run: run_id.clone(),
                    case: case.clone(),
                    value: raw.clone(),
                })
            })
            .collect::<Result<Vec<bool>>>()?;
        status_rows.push(parsed);
    }

    let mut duration_rows = Vec::with_capacity(run_ids.len());
    for (run_id, row) in run_ids.iter().zip(&duration_table.cells) {
        let parsed = row
            .iter()
            .zip(&cases)
            .map(|(raw, case)| {
                raw.parse::<f64>().map_err(|_| TtffError::InvalidCell {
                    table: "duration",
                    run: run_id.clone(),
                    case: case.clone(),
                    value: raw.clone(),
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        duration_rows.push(parsed);
    }

    let matrix = RunMatrix::new(run_ids, cases, status_rows, duration_rows)?;
    tracing::debug!(
        runs = matrix.run_count(),
        cases = matrix.case_count(),
        "loaded run matrix"
    );
    Ok(matrix)
}

/// [`load_tables`] over two files on disk.
pub fn load_table_files(statuses: &Path, durations: &Path) -> Result<RunMatrix> {
    let open = |path: &Path| {
        File::open(path).map_err(|source| TtffError::ReadFile {
            path: path.to_path_buf(),
            source,
        })
    };
    load_tables(open(statuses)?, open(durations)?)
}
