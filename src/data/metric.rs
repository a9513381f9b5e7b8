use crate::error::LoadError;
use crate::source::Resource;
use csv::{ReaderBuilder, StringRecord, Trim};
use std::collections::HashMap;

/// Region name to metric value, rebuilt on every fetch
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MetricTable {
    values: HashMap<String, f64>,
    skipped: usize,
}

impl MetricTable {
    /// Parse a `region,value` CSV. The first record is the header and is
    /// discarded; bad rows are skipped.
    pub fn parse(data: impl AsRef<[u8]>) -> Self {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(data.as_ref());

        let mut table = MetricTable::default();

        for (row, result) in reader.records().enumerate() {
            // +2: one for the header, one for 1-based line numbers
            let line = row + 2;
            match result {
                Ok(record) => match parse_row(&record) {
                    Ok((region, value)) => {
                        if table.values.insert(region.to_string(), value).is_some() {
                            log::debug!("metric row {}: duplicate region {:?}, keeping later value", line, region);
                        }
                    }
                    Err(reason) => {
                        log::debug!("skipping metric row {}: {}", line, reason);
                        table.skipped += 1;
                    }
                },
                Err(e) => {
                    log::debug!("skipping metric row {}: {}", line, e);
                    table.skipped += 1;
                }
            }
        }

        table
    }

    pub fn get(&self, region: &str) -> Option<f64> {
        self.values.get(region).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of data rows dropped while parsing
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

fn parse_row(record: &StringRecord) -> Result<(&str, f64), String> {
    let region = record.get(0).filter(|s| !s.is_empty()).ok_or("missing region name")?;
    let raw = record.get(1).filter(|s| !s.is_empty()).ok_or("missing value")?;

    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok((region, value)),
        _ => Err(format!("value {:?} is not a number", raw)),
    }
}

/// Fetch and parse a metric CSV
pub fn load_metric(resource: &Resource) -> Result<MetricTable, LoadError> {
    let bytes = resource.fetch_bytes()?;
    let table = MetricTable::parse(&bytes);

    if table.skipped() > 0 {
        log::warn!("{}: skipped {} malformed rows", resource, table.skipped());
    }
    log::info!("{}: loaded {} metric values", resource, table.len());

    Ok(table)
}
