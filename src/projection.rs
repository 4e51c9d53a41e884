//! Projection of flat records into the latest-period and timeseries views.
//!
//! [reduce] is the entry point that runs the whole reduction for one cube: catalog, cell
//! materialisation, unit choice and both projections.

use std::cmp::Ordering;

use crate::catalog::Catalog;
use crate::cells::{self, FlatRecord, TIME_DIMENSION};
use crate::error::EtlError;
use crate::models::{CountrySeries, CubeDocument, LatestRecord, SeriesPoint};
use crate::units;

use indexmap::IndexMap;
use validator::Validate;

/// Metadata describing how a cube was reduced.
#[derive(Clone, Debug, PartialEq)]
pub struct ReductionMeta {
    /// Ordered dimension names
    pub dim_ids: Vec<String>,
    /// Sorted unit codes observed before unit filtering
    pub units_present: Vec<String>,
    /// Unit the records were filtered to, if one was chosen
    pub chosen_unit: Option<String>,
    /// Code of the most recent period
    pub latest_time_code: String,
    /// Label of the most recent period
    pub latest_time_label: String,
}

/// Both projections of a cube and their metadata.
#[derive(Clone, Debug, PartialEq)]
pub struct Reduction {
    /// One record per geography for the most recent period, by value descending
    pub latest: Vec<LatestRecord>,
    /// One series per geography, by geography code
    pub timeseries: Vec<CountrySeries>,
    /// Reduction metadata
    pub meta: ReductionMeta,
}

impl Reduction {
    /// Returns the total number of points over all series.
    pub fn timeseries_point_count(&self) -> usize {
        self.timeseries.iter().map(|series| series.series.len()).sum()
    }
}

/// Compare values so that larger values come first and missing values come last.
fn value_descending(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Build the latest-period cross-section.
///
/// Keeps the records at `latest_position`, sorted by value descending with missing values after
/// all present values. Records with equal values keep their input order.
///
/// # Arguments
///
/// * `records`: Unit-filtered records
/// * `latest_position`: Time position of the most recent period
pub fn latest_period(records: &[FlatRecord], latest_position: usize) -> Vec<LatestRecord> {
    let mut latest: Vec<&FlatRecord> = records
        .iter()
        .filter(|record| record.time.position == latest_position)
        .collect();
    latest.sort_by(|a, b| value_descending(a.value, b.value));
    latest
        .into_iter()
        .map(|record| LatestRecord {
            country_code: record.geo.as_ref().map(|geo| geo.code.clone()),
            country: record.geo.as_ref().map(|geo| geo.label.clone()),
            time: record.time.label.clone(),
            value_pct_gdp: record.value,
        })
        .collect()
}

/// Build one series per geography.
///
/// Series are ordered by geography code and their points by time position. Records without a
/// geography are skipped.
///
/// # Arguments
///
/// * `records`: Unit-filtered records
/// * `unit_label`: Unit label stamped on every series
pub fn timeseries(records: &[FlatRecord], unit_label: &str) -> Vec<CountrySeries> {
    let mut sorted: Vec<(&str, &FlatRecord)> = records
        .iter()
        .filter_map(|record| record.geo_code().map(|code| (code, record)))
        .collect();
    sorted.sort_by(|(a_code, a), (b_code, b)| {
        a_code
            .cmp(b_code)
            .then(a.time.position.cmp(&b.time.position))
    });

    let mut by_geo: IndexMap<&str, CountrySeries> = IndexMap::new();
    for (code, record) in sorted {
        by_geo
            .entry(code)
            .or_insert_with(|| CountrySeries {
                country_code: code.to_string(),
                country: record
                    .geo
                    .as_ref()
                    .map(|geo| geo.label.clone())
                    .unwrap_or_default(),
                unit: unit_label.to_string(),
                series: vec![],
            })
            .series
            .push(SeriesPoint {
                time: record.time.label.clone(),
                value_pct_gdp: record.value,
            });
    }
    by_geo.into_values().collect()
}

/// Reduce a cube into its latest-period and timeseries projections.
///
/// The most recent period is always the last declared position of the time dimension, not the
/// latest position observed in the data.
///
/// # Arguments
///
/// * `cube`: The cube document
/// * `unit_label`: Unit label stamped on every series
#[tracing::instrument(level = "DEBUG", skip(cube))]
pub fn reduce(cube: &CubeDocument, unit_label: &str) -> Result<Reduction, EtlError> {
    cube.validate()?;
    if cube.value.is_empty() {
        return Err(EtlError::EmptyValues);
    }
    let catalog = Catalog::build(cube)?;

    let time = catalog
        .get(TIME_DIMENSION)
        .ok_or(EtlError::MissingTimeDimension)?;
    let unknown_latest = || EtlError::UnknownPosition {
        dimension: TIME_DIMENSION.to_string(),
        position: time.size.saturating_sub(1),
    };
    let latest_position = time.size.checked_sub(1).ok_or_else(unknown_latest)?;
    let latest_time_code = time.code(latest_position).ok_or_else(unknown_latest)?;
    let latest_time_label = time.label(latest_time_code).to_string();
    let latest_time_code = latest_time_code.to_string();

    let records = cells::materialize(cube, &catalog)?;
    let units_present = units::units_present(&records);
    let chosen_unit = units::choose_unit(&records);
    let records = match &chosen_unit {
        Some(unit) => units::filter_unit(records, unit),
        None => {
            tracing::warn!(
                units = ?units_present,
                "no percentage-of-GDP unit identified, projecting all units"
            );
            records
        }
    };

    let reduction = Reduction {
        latest: latest_period(&records, latest_position),
        timeseries: timeseries(&records, unit_label),
        meta: ReductionMeta {
            dim_ids: catalog.dim_ids.clone(),
            units_present,
            chosen_unit,
            latest_time_code,
            latest_time_label,
        },
    };
    tracing::debug!(
        records = records.len(),
        latest = reduction.latest.len(),
        series = reduction.timeseries.len(),
        "reduced cube"
    );
    Ok(reduction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::test_utils;

    use serde_json::json;

    fn latest_summary(latest: &[LatestRecord]) -> Vec<(Option<&str>, Option<f64>)> {
        latest
            .iter()
            .map(|r| (r.country_code.as_deref(), r.value_pct_gdp))
            .collect()
    }

    #[test]
    fn reduce_sample_cube() {
        let reduction = reduce(&test_utils::get_test_cube(), "% of GDP").unwrap();
        assert_eq!(
            vec![(Some("DE"), Some(65.0)), (Some("BE"), Some(60.0))],
            latest_summary(&reduction.latest)
        );
        assert_eq!(
            LatestRecord {
                country_code: Some("DE".to_string()),
                country: Some("Germany".to_string()),
                time: "2023-Q4".to_string(),
                value_pct_gdp: Some(65.0),
            },
            reduction.latest[0]
        );
        assert_eq!(
            vec![
                CountrySeries {
                    country_code: "BE".to_string(),
                    country: "Belgium".to_string(),
                    unit: "% of GDP".to_string(),
                    series: vec![
                        SeriesPoint {
                            time: "2023-Q3".to_string(),
                            value_pct_gdp: Some(80.0),
                        },
                        SeriesPoint {
                            time: "2023-Q4".to_string(),
                            value_pct_gdp: Some(60.0),
                        },
                    ],
                },
                CountrySeries {
                    country_code: "DE".to_string(),
                    country: "Germany".to_string(),
                    unit: "% of GDP".to_string(),
                    series: vec![
                        SeriesPoint {
                            time: "2023-Q3".to_string(),
                            value_pct_gdp: Some(82.0),
                        },
                        SeriesPoint {
                            time: "2023-Q4".to_string(),
                            value_pct_gdp: Some(65.0),
                        },
                    ],
                },
            ],
            reduction.timeseries
        );
        assert_eq!(4, reduction.timeseries_point_count());
        assert_eq!(
            ReductionMeta {
                dim_ids: vec!["unit".to_string(), "geo".to_string(), "time".to_string()],
                units_present: vec!["PC_GDP".to_string()],
                chosen_unit: Some("PC_GDP".to_string()),
                latest_time_code: "2023-Q4".to_string(),
                latest_time_label: "2023-Q4".to_string(),
            },
            reduction.meta
        );
    }

    #[test]
    fn latest_single_period_two_geos_missing_last() {
        let cube = test_utils::cube_from_json(json!({
            "id": ["geo", "time"],
            "size": [3, 1],
            "dimension": {
                "geo": {"category": {"index": {"AT": 0, "BE": 1, "CY": 2}}},
                "time": {"category": {"index": {"2024": 0}}}
            },
            "value": {"0": null, "1": -3.5, "2": 12.0}
        }));
        let reduction = reduce(&cube, "% of GDP").unwrap();
        assert_eq!(
            vec![
                (Some("CY"), Some(12.0)),
                (Some("BE"), Some(-3.5)),
                (Some("AT"), None)
            ],
            latest_summary(&reduction.latest)
        );
    }

    #[test]
    fn latest_two_geos() {
        let cube = test_utils::cube_from_json(json!({
            "id": ["geo", "time"],
            "size": [2, 1],
            "dimension": {
                "geo": {"category": {"index": {"BE": 0, "DE": 1}}},
                "time": {"category": {"index": {"2024": 0}}}
            },
            "value": {"0": 105.0, "1": 63.0}
        }));
        let reduction = reduce(&cube, "% of GDP").unwrap();
        assert_eq!(
            vec![(Some("BE"), Some(105.0)), (Some("DE"), Some(63.0))],
            latest_summary(&reduction.latest)
        );
    }

    #[test]
    fn latest_uses_last_declared_period() {
        // The last declared period has no observations, so the cross-section is empty even
        // though earlier periods are complete.
        let cube = test_utils::cube_from_json(json!({
            "id": ["geo", "time"],
            "size": [1, 3],
            "dimension": {
                "geo": {"category": {"index": {"BE": 0}}},
                "time": {"category": {"index": {"2022": 0, "2023": 1, "2024": 2}}}
            },
            "value": {"0": 1.0, "1": 2.0}
        }));
        let reduction = reduce(&cube, "% of GDP").unwrap();
        assert!(reduction.latest.is_empty());
        assert_eq!("2024", reduction.meta.latest_time_code);
        assert_eq!(2, reduction.timeseries[0].series.len());
    }

    #[test]
    fn latest_uses_declared_length() {
        let cube = test_utils::cube_from_json(json!({
            "id": ["geo", "time"],
            "size": [1, 2],
            "dimension": {
                "geo": {"category": {"index": {"BE": 0}}},
                "time": {"category": {"index": {"2023": 0, "2024": 1}, "length": 1}}
            },
            "value": {"0": 1.0, "1": 2.0}
        }));
        let reduction = reduce(&cube, "% of GDP").unwrap();
        assert_eq!("2023", reduction.meta.latest_time_code);
        assert_eq!(
            vec![(Some("BE"), Some(1.0))],
            latest_summary(&reduction.latest)
        );
    }

    #[test]
    fn latest_stable_for_equal_values() {
        let cube = test_utils::cube_from_str(
            r#"{
                "id": ["geo", "time"],
                "size": [3, 1],
                "dimension": {
                    "geo": {"category": {"index": {"AT": 0, "BE": 1, "CY": 2}}},
                    "time": {"category": {"index": {"2024": 0}}}
                },
                "value": {"2": 5.0, "0": 5.0, "1": 7.0}
            }"#,
        );
        let reduction = reduce(&cube, "% of GDP").unwrap();
        assert_eq!(
            vec![
                (Some("BE"), Some(7.0)),
                (Some("CY"), Some(5.0)),
                (Some("AT"), Some(5.0))
            ],
            latest_summary(&reduction.latest)
        );
    }

    #[test]
    fn timeseries_three_periods_ascending() {
        // Values listed out of order to check the sort.
        let cube = test_utils::cube_from_str(
            r#"{
                "id": ["geo", "time"],
                "size": [2, 3],
                "dimension": {
                    "geo": {"category": {"index": {"SE": 0, "FI": 1}}},
                    "time": {"category": {"index": {"2022": 0, "2023": 1, "2024": 2}}}
                },
                "value": {"5": 6.0, "2": 3.0, "0": 1.0, "4": 5.0, "1": 2.0, "3": 4.0}
            }"#,
        );
        let reduction = reduce(&cube, "% of GDP").unwrap();
        let codes: Vec<_> = reduction
            .timeseries
            .iter()
            .map(|s| s.country_code.as_str())
            .collect();
        assert_eq!(vec!["FI", "SE"], codes);
        for series in &reduction.timeseries {
            let times: Vec<_> = series.series.iter().map(|p| p.time.as_str()).collect();
            assert_eq!(vec!["2022", "2023", "2024"], times);
        }
        let fi: Vec<_> = reduction.timeseries[0]
            .series
            .iter()
            .map(|p| p.value_pct_gdp)
            .collect();
        assert_eq!(vec![Some(4.0), Some(5.0), Some(6.0)], fi);
    }

    #[test]
    fn timeseries_length_matches_observed_periods() {
        let cube = test_utils::cube_from_json(json!({
            "id": ["geo", "time"],
            "size": [2, 3],
            "dimension": {
                "geo": {"category": {"index": {"BE": 0, "DE": 1}}},
                "time": {"category": {"index": {"2022": 0, "2023": 1, "2024": 2}}}
            },
            "value": {"0": 1.0, "2": 3.0, "3": 4.0, "4": 5.0, "5": 6.0}
        }));
        let reduction = reduce(&cube, "% of GDP").unwrap();
        let be: Vec<_> = reduction.timeseries[0]
            .series
            .iter()
            .map(|p| p.time.as_str())
            .collect();
        assert_eq!(vec!["2022", "2024"], be);
        assert_eq!(3, reduction.timeseries[1].series.len());
    }

    #[test]
    fn timeseries_skips_records_without_geo() {
        let cube = test_utils::cube_from_json(json!({
            "id": ["time"],
            "size": [2],
            "dimension": {"time": {"category": {"index": {"2023": 0, "2024": 1}}}},
            "value": {"0": 1.0, "1": 2.0}
        }));
        let reduction = reduce(&cube, "% of GDP").unwrap();
        assert!(reduction.timeseries.is_empty());
        assert_eq!(vec![(None, Some(2.0))], latest_summary(&reduction.latest));
    }

    #[test]
    fn reduce_filters_to_chosen_unit() {
        let cube = test_utils::cube_from_json(json!({
            "id": ["unit", "geo", "time"],
            "size": [2, 1, 1],
            "dimension": {
                "unit": {
                    "category": {
                        "index": {"MIO_EUR": 0, "PC_GDP": 1},
                        "label": {"MIO_EUR": "Million euro", "PC_GDP": "Percentage of GDP"}
                    }
                },
                "geo": {"category": {"index": {"BE": 0}}},
                "time": {"category": {"index": {"2024": 0}}}
            },
            "value": {"0": 600000.0, "1": 105.0}
        }));
        let reduction = reduce(&cube, "% of GDP").unwrap();
        assert_eq!(vec!["MIO_EUR", "PC_GDP"], reduction.meta.units_present);
        assert_eq!(Some("PC_GDP".to_string()), reduction.meta.chosen_unit);
        assert_eq!(
            vec![(Some("BE"), Some(105.0))],
            latest_summary(&reduction.latest)
        );
        assert_eq!(1, reduction.timeseries_point_count());
    }

    #[test]
    fn reduce_without_chosen_unit_keeps_all_records() {
        let cube = test_utils::cube_from_json(json!({
            "id": ["unit", "geo", "time"],
            "size": [2, 1, 1],
            "dimension": {
                "unit": {"category": {"index": {"MIO_EUR": 0, "MIO_NAC": 1}}},
                "geo": {"category": {"index": {"BE": 0}}},
                "time": {"category": {"index": {"2024": 0}}}
            },
            "value": {"0": 1.0, "1": 2.0}
        }));
        let reduction = reduce(&cube, "% of GDP").unwrap();
        assert_eq!(None, reduction.meta.chosen_unit);
        assert_eq!(2, reduction.latest.len());
        assert_eq!(2, reduction.timeseries[0].series.len());
    }

    #[test]
    fn reduce_empty_values() {
        let mut cube = test_utils::get_test_cube();
        cube.value.clear();
        assert!(matches!(
            reduce(&cube, "% of GDP").unwrap_err(),
            EtlError::EmptyValues
        ));
    }

    #[test]
    fn reduce_empty_values_before_missing_dimension() {
        let mut cube = test_utils::get_test_cube();
        cube.value.clear();
        cube.dimension.clear();
        assert!(matches!(
            reduce(&cube, "% of GDP").unwrap_err(),
            EtlError::EmptyValues
        ));
    }

    #[test]
    fn reduce_missing_time_dimension() {
        let cube = test_utils::cube_from_json(json!({
            "id": ["geo"],
            "size": [1],
            "dimension": {"geo": {"category": {"index": {"BE": 0}}}},
            "value": {"0": 1.0}
        }));
        assert!(matches!(
            reduce(&cube, "% of GDP").unwrap_err(),
            EtlError::MissingTimeDimension
        ));
    }

    #[test]
    fn reduce_invalid_cube() {
        let mut cube = test_utils::get_test_cube();
        cube.size = vec![1, 2];
        assert!(matches!(
            reduce(&cube, "% of GDP").unwrap_err(),
            EtlError::CubeValidation(_)
        ));
    }

    #[test]
    fn reduce_cell_space_overflow() {
        let cube = test_utils::cube_from_json(json!({
            "id": ["geo", "time"],
            "size": [usize::MAX, 2],
            "dimension": {
                "geo": {"category": {"index": {"BE": 0}}},
                "time": {"category": {"index": {"2023": 0, "2024": 1}}}
            },
            "value": {"0": 1.0}
        }));
        let error = reduce(&cube, "% of GDP").unwrap_err();
        assert!(matches!(error, EtlError::CubeValidation(_)));
        assert_eq!(ErrorKind::Structural, error.kind());
    }

    #[test]
    fn value_ordering() {
        assert_eq!(Ordering::Less, value_descending(Some(2.0), Some(1.0)));
        assert_eq!(Ordering::Greater, value_descending(Some(-1.0), Some(1.0)));
        assert_eq!(Ordering::Less, value_descending(Some(-100.0), None));
        assert_eq!(Ordering::Greater, value_descending(None, Some(-100.0)));
        assert_eq!(Ordering::Equal, value_descending(None, None));
    }
}
