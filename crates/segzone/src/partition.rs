//! Calendar partitions of the segment source data.

use crate::error::{Result, SegzoneError};
use crate::ident::{Ident, TableName};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One year-month slice of the segment source, `year{Y}.segments_{Y}_{MM}`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Partition {
    pub year: u16,
    pub month: u8,
}

impl Partition {
    pub fn new(year: u16, month: u8) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(SegzoneError::config(format!(
                "month {month} out of range 1..=12 for year {year}"
            )));
        }
        Ok(Self { year, month })
    }

    /// Schema holding the partition, `year{Y}`.
    #[must_use]
    pub fn schema(&self) -> Ident {
        Ident::trusted(format!("year{}", self.year))
    }

    /// Table name without schema, `segments_{Y}_{MM}`.
    #[must_use]
    pub fn local_name(&self) -> Ident {
        Ident::trusted(format!("segments_{}_{:02}", self.year, self.month))
    }

    /// Fully qualified source table.
    #[must_use]
    pub fn table(&self) -> TableName {
        TableName::new(Some(self.schema()), self.local_name())
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.table())
    }
}

/// Expand years × months into partitions, years outer and months inner.
///
/// No existence check is made; a missing table surfaces when it is first
/// queried.
pub fn enumerate(years: &[u16], months: &[u8]) -> Result<Vec<Partition>> {
    let mut out = Vec::with_capacity(years.len() * months.len());
    for &year in years {
        for &month in months {
            out.push(Partition::new(year, month)?);
        }
    }
    Ok(out)
}

/// Drop repeated partitions, keeping the first occurrence.
#[must_use]
pub fn dedup_in_order(partitions: Vec<Partition>) -> Vec<Partition> {
    let mut seen = std::collections::BTreeSet::new();
    partitions.into_iter().filter(|p| seen.insert(*p)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_naming() {
        let p = Partition::new(2024, 6).unwrap();
        assert_eq!(p.to_string(), "year2024.segments_2024_06");
        assert_eq!(p.schema().as_str(), "year2024");
        assert_eq!(p.local_name().as_str(), "segments_2024_06");
        assert_eq!(p.table().quoted(), "\"year2024\".\"segments_2024_06\"");
    }

    #[test]
    fn test_enumerate_years_outer_months_inner() {
        let names: Vec<String> = enumerate(&[2020, 2021], &[1, 12])
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(
            names,
            vec![
                "year2020.segments_2020_01",
                "year2020.segments_2020_12",
                "year2021.segments_2021_01",
                "year2021.segments_2021_12",
            ]
        );
    }

    #[test]
    fn test_enumerate_rejects_bad_month() {
        assert!(enumerate(&[2020], &[0]).is_err());
        assert!(enumerate(&[2020], &[13]).is_err());
        assert!(enumerate(&[], &[13]).unwrap().is_empty());
    }

    #[test]
    fn test_dedup_keeps_first() {
        let a = Partition::new(2020, 1).unwrap();
        let b = Partition::new(2020, 2).unwrap();
        assert_eq!(dedup_in_order(vec![b, a, b, a]), vec![b, a]);
    }
}
