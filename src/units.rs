//! Choice of the unit of measure representing "percentage of GDP".

use crate::cells::FlatRecord;

use std::collections::BTreeSet;

use indexmap::IndexMap;

/// Unit codes known to mean "percentage of GDP", in order of preference.
pub const PREFERRED_UNIT_CODES: [&str; 4] = ["PC_GDP", "PCGDP", "PCT_GDP", "PCTGDP"];

/// Returns the sorted distinct unit codes present in `records`.
pub fn units_present(records: &[FlatRecord]) -> Vec<String> {
    records
        .iter()
        .filter_map(FlatRecord::unit_code)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(String::from)
        .collect()
}

/// Choose the unit code representing "percentage of GDP".
///
/// The first rule that matches wins:
///
/// 1. A code from [PREFERRED_UNIT_CODES] that is present, in list order.
/// 2. The first code, in record order, whose label contains `%`.
/// 3. The only code, when exactly one distinct code is present.
///
/// Returns `None` otherwise, in which case callers project the unfiltered records.
pub fn choose_unit(records: &[FlatRecord]) -> Option<String> {
    let present = units_present(records);
    if let Some(code) = PREFERRED_UNIT_CODES
        .iter()
        .find(|code| present.iter().any(|present| present == *code))
    {
        return Some(code.to_string());
    }

    // First label seen for each code.
    let mut labels: IndexMap<&str, &str> = IndexMap::new();
    for unit in records.iter().filter_map(|record| record.unit.as_ref()) {
        labels.entry(unit.code.as_str()).or_insert(unit.label.as_str());
    }
    if let Some((code, _)) = labels.iter().find(|(_, label)| label.contains('%')) {
        return Some(code.to_string());
    }

    match present.as_slice() {
        [only] => Some(only.clone()),
        _ => None,
    }
}

/// Keep only the records measured in `unit`.
pub fn filter_unit(records: Vec<FlatRecord>, unit: &str) -> Vec<FlatRecord> {
    records
        .into_iter()
        .filter(|record| record.unit_code() == Some(unit))
        .collect()
}
