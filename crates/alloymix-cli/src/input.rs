//! CSV files to raw rows. Validation is left to the normalizer.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use alloymix_blend::{BatchJob, Material, RawRow, SpecTable, normalize_materials, normalize_specs};

use crate::error::CliError;

/// Read a headed CSV into one [`RawRow`] per record
pub fn read_rows<R: Read>(source: R) -> Result<Vec<RawRow>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(source);

    let headers = reader.headers()?.clone();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(headers.iter().zip(record.iter()).collect());
    }
    Ok(rows)
}

fn read_file(path: &Path) -> Result<Vec<RawRow>, CliError> {
    let file = File::open(path).map_err(|e| CliError::Read {
        path: path.to_path_buf(),
        source: csv::Error::from(e),
    })?;
    read_rows(file).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_materials(path: &Path) -> Result<Vec<Material>, CliError> {
    let rows = read_file(path)?;
    normalize_materials(&rows).map_err(|source| CliError::Invalid {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_specs(path: &Path) -> Result<SpecTable, CliError> {
    let rows = read_file(path)?;
    normalize_specs(&rows).map_err(|source| CliError::Invalid {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_jobs(path: &Path) -> Result<BatchJob, CliError> {
    let rows = read_file(path)?;
    parse_jobs(path, &rows)
}

/// `Product,Amount` rows, kept in file order
pub fn parse_jobs(path: &Path, rows: &[RawRow]) -> Result<BatchJob, CliError> {
    let mut jobs = BatchJob::new();
    for (i, row) in rows.iter().enumerate() {
        let job_error = |message: String| CliError::Job {
            path: path.to_path_buf(),
            row: i + 1,
            message,
        };

        let product = row.get("Product").unwrap_or_default();
        if product.is_empty() {
            return Err(job_error("missing Product".to_string()));
        }
        let text = row.get("Amount").unwrap_or_default();
        let amount: f64 = text
            .parse()
            .map_err(|_| job_error(format!("Amount must be numeric, got '{}'", text)))?;
        jobs.push(product, amount);
    }
    Ok(jobs)
}
