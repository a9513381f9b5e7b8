use crate::error::LoadError;
use crate::source::Resource;
use csv::{ReaderBuilder, Trim};
use std::collections::HashSet;

/// A data column whose header encodes `group:bin`
#[derive(Clone, Debug, PartialEq, Eq)]
struct Column {
    /// Field index in each row
    index: usize,
    group: String,
    bin: String,
}

impl Column {
    fn from_header(index: usize, cell: &str) -> Option<Self> {
        let (group, bin) = cell.split_once(':')?;
        Some(Self {
            index,
            group: group.trim().to_string(),
            bin: bin.trim().to_string(),
        })
    }
}

/// One bar of a frequency distribution
#[derive(Clone, Debug, PartialEq)]
pub struct Bin {
    pub label: String,
    pub value: f64,
}

/// Bins of one group for one region, in source column order
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BinSeries {
    pub region: String,
    pub group: String,
    pub bins: Vec<Bin>,
}

impl BinSeries {
    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> + '_ {
        self.bins.iter().map(|b| b.label.as_str())
    }
}

/// Wide-format frequency table: one row per region, `group:bin` columns
#[derive(Clone, Debug, Default)]
pub struct FrequencyTable {
    columns: Vec<Column>,
    groups: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl FrequencyTable {
    pub fn parse(data: impl AsRef<[u8]>) -> Self {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(data.as_ref());

        let columns: Vec<Column> = match reader.headers() {
            Ok(header) => header
                .iter()
                .enumerate()
                .skip(1)
                .filter_map(|(index, cell)| {
                    let column = Column::from_header(index, cell);
                    if column.is_none() {
                        log::debug!("frequency column {} ({:?}) has no group:bin key", index, cell);
                    }
                    column
                })
                .collect(),
            Err(e) => {
                log::warn!("unreadable frequency header: {}", e);
                Vec::new()
            }
        };

        let groups = {
            let mut seen = HashSet::new();
            columns
                .iter()
                .filter(|c| seen.insert(c.group.as_str()))
                .map(|c| c.group.clone())
                .collect()
        };

        let mut rows = Vec::new();
        for (row, result) in reader.records().enumerate() {
            match result {
                Ok(record) => rows.push(record.iter().map(str::to_string).collect()),
                Err(e) => log::debug!("skipping frequency row {}: {}", row + 2, e),
            }
        }

        Self { columns, groups, rows }
    }

    /// Distinct group names in first-seen column order
    pub fn group_names(&self) -> &[String] {
        &self.groups
    }

    /// Region names in row order
    pub fn regions(&self) -> Vec<String> {
        self.rows
            .iter()
            .filter_map(|row| row.first())
            .filter(|name| !name.is_empty())
            .cloned()
            .collect()
    }

    /// Bin labels of a group, in column order
    pub fn bin_labels(&self, group: &str) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.group == group)
            .map(|c| c.bin.as_str())
            .collect()
    }

    fn row(&self, region: &str) -> Option<&[String]> {
        self.rows
            .iter()
            .find(|row| row.first().is_some_and(|name| name == region))
            .map(Vec::as_slice)
    }

    /// Extract the series for one region and group. Unknown regions or
    /// groups yield an empty series; non-numeric cells drop their bin.
    pub fn bin_series(&self, region: &str, group: &str) -> BinSeries {
        let mut series = BinSeries {
            region: region.to_string(),
            group: group.to_string(),
            bins: Vec::new(),
        };

        let Some(row) = self.row(region) else {
            log::debug!("no frequency row for region {:?}", region);
            return series;
        };

        for column in self.columns.iter().filter(|c| c.group == group) {
            let raw = row.get(column.index).map(String::as_str).unwrap_or("");
            match raw.parse::<f64>() {
                Ok(value) if value.is_finite() => series.bins.push(Bin {
                    label: column.bin.clone(),
                    value,
                }),
                _ => log::debug!(
                    "dropping bin {:?} for {:?}: value {:?} is not a number",
                    column.bin,
                    region,
                    raw
                ),
            }
        }

        series
    }
}

/// Fetch and parse the frequency CSV
pub fn load_frequency(resource: &Resource) -> Result<FrequencyTable, LoadError> {
    let bytes = resource.fetch_bytes()?;
    let table = FrequencyTable::parse(&bytes);
    log::info!(
        "{}: {} regions, {} groups, {} bin columns",
        resource,
        table.rows.len(),
        table.groups.len(),
        table.columns.len()
    );
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
state,Age: 0-10,Age: 10-20,Income: Low,Age: 20+,Income: High
Texas,5,7,100,9,30
Ohio,1,2,3,4,5
West Virginia,8,x,6,,2
";

    #[test]
    fn test_header_groups_and_bins() {
        let table = FrequencyTable::parse("state,Age:0-10,Age:10-20,Income:Low\n");
        assert_eq!(table.group_names(), ["Age", "Income"]);
        assert_eq!(table.bin_labels("Age"), ["0-10", "10-20"]);
        assert_eq!(table.bin_labels("Income"), ["Low"]);
    }

    #[test]
    fn test_bin_label_leading_space_trimmed() {
        let table = FrequencyTable::parse(SAMPLE);
        assert_eq!(table.group_names(), ["Age", "Income"]);
        assert_eq!(table.bin_labels("Age"), ["0-10", "10-20", "20+"]);
    }

    #[test]
    fn test_series_follows_column_order() {
        let table = FrequencyTable::parse(SAMPLE);
        let series = table.bin_series("Texas", "Age");
        let labels: Vec<&str> = series.labels().collect();
        let values: Vec<f64> = series.bins.iter().map(|b| b.value).collect();
        assert_eq!(labels, ["0-10", "10-20", "20+"]);
        assert_eq!(values, [5.0, 7.0, 9.0]);

        let income = table.bin_series("Texas", "Income");
        let values: Vec<f64> = income.bins.iter().map(|b| b.value).collect();
        assert_eq!(values, [100.0, 30.0]);
    }

    #[test]
    fn test_unknown_region_or_group_is_empty() {
        let table = FrequencyTable::parse(SAMPLE);
        assert!(table.bin_series("Atlantis", "Age").is_empty());
        assert!(table.bin_series("Texas", "Height").is_empty());
    }

    #[test]
    fn test_region_match_is_exact() {
        let table = FrequencyTable::parse(SAMPLE);
        assert!(table.bin_series("West", "Age").is_empty());
        assert!(table.bin_series("texas", "Age").is_empty());
        assert!(!table.bin_series("West Virginia", "Age").is_empty());
    }

    #[test]
    fn test_non_numeric_cells_drop_bins() {
        let table = FrequencyTable::parse(SAMPLE);
        let series = table.bin_series("West Virginia", "Age");
        let labels: Vec<&str> = series.labels().collect();
        assert_eq!(labels, ["0-10"]);
        assert_eq!(series.bins[0].value, 8.0);
    }

    #[test]
    fn test_regions_in_row_order() {
        let table = FrequencyTable::parse(SAMPLE);
        assert_eq!(table.regions(), ["Texas", "Ohio", "West Virginia"]);
    }

    #[test]
    fn test_columns_without_key_are_ignored() {
        let table = FrequencyTable::parse("state,total,Age:0-10\nOhio,99,4\n");
        assert_eq!(table.group_names(), ["Age"]);
        let series = table.bin_series("Ohio", "Age");
        assert_eq!(series.bins, vec![Bin { label: "0-10".to_string(), value: 4.0 }]);
    }

    #[test]
    fn test_empty_input() {
        let table = FrequencyTable::parse("");
        assert!(table.group_names().is_empty());
        assert!(table.regions().is_empty());
    }

    #[test]
    fn test_latin1_row_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("freq.csv");
        std::fs::write(&path, b"state,Age: 0-10\nNuevo Le\xf3n,3\nOhio,4\n").unwrap();

        let table = load_frequency(&Resource::File(path)).unwrap();
        assert_eq!(table.regions(), ["Ohio"]);
        assert_eq!(table.bin_series("Ohio", "Age").bins[0].value, 4.0);
    }
}
