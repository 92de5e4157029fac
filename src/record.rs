//! Fee records: the raw shape served by the membership API and the flat
//! field map the templates are filled from.

use std::collections::BTreeMap;
use std::fmt;

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PrintError;

// ============================================================================
// Constants
// ============================================================================

/// Member id used for association-level fees that belong to no member.
pub const ASSOCIATION_MEMBER_ID: i64 = 1;

/// Fee code given to association-level fees.
pub const ASSOCIATION_FEE_CODE: i64 = 0;

const MONTH_NAMES: [&str; 12] = [
    "Enero", "Febrero", "Marzo", "Abril", "Mayo", "Junio",
    "Julio", "Agosto", "Septiembre", "Octubre", "Noviembre", "Diciembre",
];

/// Fields produced by [`map_record`].
pub const NORMALIZED_FIELDS: &[&str] = &[
    "member_code", "fee_code", "fee_month", "fee_value",
    "zone", "member_name", "member_address", "member_type",
];

// ============================================================================
// Field Values
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Decimal(f64),
    Text(String),
}

impl FieldValue {
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(n) => Some(*n),
            FieldValue::Text(s) => s.trim().parse().ok(),
            FieldValue::Decimal(_) => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Integer(n) => write!(f, "{}", n),
            // Whole values keep their ".0", as the API client printed them
            FieldValue::Decimal(x) => write!(f, "{:?}", x),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Integer(n)
    }
}

impl From<f64> for FieldValue {
    fn from(x: f64) -> Self {
        FieldValue::Decimal(x)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

// ============================================================================
// Records
// ============================================================================

/// Field name to value map consumed by the resolver.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(BTreeMap<String, FieldValue>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<FieldValue>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.0.get(field)
    }

    /// The receipt number, when it is a whole number.
    pub fn fee_code(&self) -> Option<i64> {
        self.get("fee_code").and_then(FieldValue::as_integer)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (field, value) in iter {
            record.insert(field, value);
        }
        record
    }
}

/// One fee row as served by `/api/tirada/...`.
///
/// Every column is optional at this level so that a missing one is reported
/// by [`map_record`] by name instead of failing the whole response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawFeeRecord {
    #[serde(rename = "So_ID", default)]
    pub member_id: Option<i64>,
    #[serde(rename = "CC_ID", default)]
    pub fee_id: Option<i64>,
    #[serde(rename = "CC_Mes", default)]
    pub month: Option<i64>,
    #[serde(rename = "CC_Anio", default)]
    pub year: Option<i64>,
    #[serde(rename = "CC_Valor", default)]
    pub amount: Option<FieldValue>,
    #[serde(rename = "Co_ID", default)]
    pub zone: Option<FieldValue>,
    #[serde(rename = "nombre", default)]
    pub name: Option<String>,
    #[serde(rename = "So_DomCob", default)]
    pub address: Option<String>,
    #[serde(rename = "Gr_Titulo", default)]
    pub category: Option<String>,
}

impl RawFeeRecord {
    pub fn from_value(value: Value) -> Result<Self, PrintError> {
        serde_json::from_value(value).map_err(|e| PrintError::InvalidRecord(e.to_string()))
    }
}

// ============================================================================
// Mapping
// ============================================================================

fn required<T: Clone>(value: &Option<T>, column: &str, raw: &RawFeeRecord) -> Result<T, PrintError> {
    value.clone().ok_or_else(|| {
        PrintError::InvalidRecord(format!("fee {:?} is missing {}", raw.fee_id, column))
    })
}

pub fn month_name(month: i64) -> Result<&'static str, PrintError> {
    usize::try_from(month)
        .ok()
        .and_then(|m| m.checked_sub(1))
        .and_then(|idx| MONTH_NAMES.get(idx))
        .copied()
        .ok_or_else(|| PrintError::InvalidRecord(format!("month {} is not between 1 and 12", month)))
}

/// Map one raw fee row onto the template field names.
pub fn map_record(raw: &RawFeeRecord) -> Result<Record, PrintError> {
    let member_id = required(&raw.member_id, "So_ID", raw)?;
    let fee_id = required(&raw.fee_id, "CC_ID", raw)?;
    let month = required(&raw.month, "CC_Mes", raw)?;
    let year = required(&raw.year, "CC_Anio", raw)?;
    let amount = required(&raw.amount, "CC_Valor", raw)?;
    let name = required(&raw.name, "nombre", raw)?;

    let fee_code = if member_id == ASSOCIATION_MEMBER_ID {
        ASSOCIATION_FEE_CODE
    } else {
        fee_id
    };

    let mut record = Record::new();
    record.insert("fee_code", fee_code);
    record.insert("fee_month", format!("{} {}", month_name(month)?, year));
    record.insert("fee_value", amount);
    record.insert("zone", raw.zone.clone().unwrap_or_else(|| FieldValue::from("")));
    record.insert("member_code", member_id);
    record.insert("member_name", name);
    record.insert("member_address", raw.address.clone().unwrap_or_default());
    record.insert("member_type", raw.category.clone().unwrap_or_default());
    Ok(record)
}

/// Records that mapped cleanly, plus how many were dropped.
#[derive(Debug, Default)]
pub struct MappedRecords {
    pub records: Vec<Record>,
    pub rejected: usize,
}

/// Map a batch of raw JSON rows, keeping order. Rows that fail are logged
/// and left out; the rest of the batch is unaffected.
pub fn map_records(values: Vec<Value>) -> MappedRecords {
    let mut mapped = MappedRecords::default();
    for (index, value) in values.into_iter().enumerate() {
        match RawFeeRecord::from_value(value).and_then(|raw| map_record(&raw)) {
            Ok(record) => mapped.records.push(record),
            Err(e) => {
                warn!("skipping record #{}: {}", index + 1, e);
                mapped.rejected += 1;
            }
        }
    }
    mapped
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(member_id: i64, fee_id: i64, month: i64) -> RawFeeRecord {
        RawFeeRecord {
            member_id: Some(member_id),
            fee_id: Some(fee_id),
            month: Some(month),
            year: Some(2024),
            amount: Some(FieldValue::from("1500.00")),
            zone: Some(FieldValue::Integer(3)),
            name: Some("Ana Pérez".into()),
            address: Some("Alsina 120".into()),
            category: Some("Activo".into()),
        }
    }

    #[test]
    fn maps_every_normalized_field() {
        let record = map_record(&raw(4521, 662464, 3)).unwrap();
        assert_eq!(record.len(), NORMALIZED_FIELDS.len());
        for field in NORMALIZED_FIELDS {
            assert!(record.get(field).is_some(), "missing {}", field);
        }
        assert_eq!(record.fee_code(), Some(662464));
        assert_eq!(record.get("fee_month"), Some(&FieldValue::from("Marzo 2024")));
        assert_eq!(record.get("fee_value").unwrap().to_string(), "1500.00");
        assert_eq!(record.get("member_code"), Some(&FieldValue::Integer(4521)));
        assert_eq!(record.get("member_type").unwrap().to_string(), "Activo");
    }

    #[test]
    fn association_member_gets_sentinel_fee_code() {
        let record = map_record(&raw(ASSOCIATION_MEMBER_ID, 99, 1)).unwrap();
        assert_eq!(record.fee_code(), Some(0));
    }

    #[test]
    fn month_out_of_range_is_invalid() {
        assert!(matches!(map_record(&raw(4521, 5, 13)), Err(PrintError::InvalidRecord(_))));
        assert!(matches!(map_record(&raw(4521, 5, 0)), Err(PrintError::InvalidRecord(_))));
        assert!(matches!(map_record(&raw(4521, 5, -1)), Err(PrintError::InvalidRecord(_))));
        assert_eq!(month_name(12).unwrap(), "Diciembre");
    }

    #[test]
    fn missing_required_column_is_named() {
        let mut incomplete = raw(4521, 5, 3);
        incomplete.name = None;
        match map_record(&incomplete) {
            Err(PrintError::InvalidRecord(msg)) => assert!(msg.contains("nombre"), "{}", msg),
            other => panic!("expected InvalidRecord, got {:?}", other),
        }
    }

    #[test]
    fn optional_columns_default_to_empty() {
        let mut sparse = raw(4521, 5, 3);
        sparse.zone = None;
        sparse.address = None;
        sparse.category = None;
        let record = map_record(&sparse).unwrap();
        assert_eq!(record.get("zone").unwrap().to_string(), "");
        assert_eq!(record.get("member_address").unwrap().to_string(), "");
    }

    #[test]
    fn parses_api_json() {
        let value = json!({
            "CC_ID": 662471, "CC_Mes": 7, "CC_Anio": 2025, "CC_Valor": 2500,
            "Co_ID": 2, "So_ID": 880, "nombre": "Luis Gómez",
            "So_DomCob": "Zelarrayán 500", "Gr_Titulo": "Cadete"
        });
        let raw = RawFeeRecord::from_value(value).unwrap();
        assert_eq!(raw.amount, Some(FieldValue::Integer(2500)));
        let record = map_record(&raw).unwrap();
        assert_eq!(record.get("fee_month").unwrap().to_string(), "Julio 2025");
    }

    #[test]
    fn batch_mapping_skips_bad_rows_and_keeps_order() {
        let values = vec![
            json!({"CC_ID": 10, "CC_Mes": 1, "CC_Anio": 2024, "CC_Valor": 100, "So_ID": 7, "nombre": "A"}),
            json!({"CC_ID": 11, "CC_Mes": 13, "CC_Anio": 2024, "CC_Valor": 100, "So_ID": 8, "nombre": "B"}),
            json!({"CC_ID": "not a number", "So_ID": 9}),
            json!({"CC_ID": 12, "CC_Mes": 2, "CC_Anio": 2024, "CC_Valor": 100, "So_ID": 9, "nombre": "C"}),
        ];
        let mapped = map_records(values);
        assert_eq!(mapped.rejected, 2);
        let codes: Vec<_> = mapped.records.iter().map(|r| r.fee_code()).collect();
        assert_eq!(codes, vec![Some(10), Some(12)]);
    }

    #[test]
    fn decimals_display_with_a_fraction() {
        assert_eq!(FieldValue::Decimal(1500.0).to_string(), "1500.0");
        assert_eq!(FieldValue::Decimal(1500.5).to_string(), "1500.5");
        assert_eq!(FieldValue::Integer(1500).to_string(), "1500");
        assert_eq!(FieldValue::from("1500.00").to_string(), "1500.00");
    }

    #[test]
    fn fee_code_parses_text_but_not_decimals() {
        assert_eq!(Record::from_iter([("fee_code", " 42 ")]).fee_code(), Some(42));
        assert_eq!(Record::from_iter([("fee_code", 4.0_f64)]).fee_code(), None);
        assert_eq!(Record::new().fee_code(), None);
    }
}
