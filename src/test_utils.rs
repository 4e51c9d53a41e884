use crate::config::DatasetConfig;
use crate::models::CubeDocument;

use serde_json::json;

/// Create a CubeDocument from a JSON value.
pub(crate) fn cube_from_json(value: serde_json::Value) -> CubeDocument {
    serde_json::from_value(value).unwrap()
}

/// Create a CubeDocument from JSON text.
///
/// Unlike [cube_from_json], object key order is kept as written.
pub(crate) fn cube_from_str(json: &str) -> CubeDocument {
    serde_json::from_str(json).unwrap()
}

/// Create the unit x geo x time cube with one unit, two geographies and two periods.
///
/// Values by (geo, time): BE = 80.0, 60.0; DE = 82.0, 65.0.
pub(crate) fn get_test_cube() -> CubeDocument {
    cube_from_json(json!({
        "id": ["unit", "geo", "time"],
        "size": [1, 2, 2],
        "dimension": {
            "unit": {"category": {"index": {"PC_GDP": 0}, "label": {"PC_GDP": "%"}}},
            "geo": {
                "category": {
                    "index": {"BE": 0, "DE": 1},
                    "label": {"BE": "Belgium", "DE": "Germany"}
                }
            },
            "time": {
                "category": {
                    "index": {"2023-Q3": 0, "2023-Q4": 1},
                    "label": {"2023-Q3": "2023-Q3", "2023-Q4": "2023-Q4"}
                }
            }
        },
        "value": {"0": 80.0, "1": 60.0, "2": 82.0, "3": 65.0}
    }))
}

/// Create a DatasetConfig with only required fields set.
pub(crate) fn get_test_dataset_config() -> DatasetConfig {
    DatasetConfig {
        id: "teina230".to_string(),
        description: "General government gross debt".to_string(),
        last_time_periods: 2,
        url: None,
        unit_label: "% of GDP".to_string(),
        notes_latest: vec!["latest note".to_string()],
        notes_timeseries: vec!["timeseries note".to_string()],
        underscore_alias: false,
    }
}
