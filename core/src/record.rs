// Sensor record data model

use serde::{Deserialize, Serialize};

/// Entity id reported for records that arrived without one.
pub const UNKNOWN_ENTITY: &str = "unknown";

/// One farm-sensor reading as produced upstream (wire format).
///
/// Every field is independently optional: readings arrive from cheap field
/// hardware over a lossy path, and downstream code must tolerate any subset
/// being missing. The record is deserialized once by the enrichment
/// consumer and discarded after being embedded in the persisted insight.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub farm_id: Option<String>,

    /// Source timestamp, ISO-8601; passed through unchanged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,

    /// Soil moisture, percent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soil_moisture: Option<f64>,

    /// Soil temperature, °C
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soil_temperature: Option<f64>,

    /// Air temperature, °C
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub air_temperature: Option<f64>,

    /// Relative humidity, percent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,

    /// Rainfall since last reading, mm
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rain_mm: Option<f64>,

    /// Soil pH
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ph: Option<f64>,
}

impl SensorRecord {
    /// Farm id, falling back to the `"unknown"` sentinel when the reading
    /// arrived without one.
    pub fn entity_id(&self) -> &str {
        match self.farm_id.as_deref() {
            Some(id) if !id.is_empty() => id,
            _ => UNKNOWN_ENTITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_id_falls_back_to_unknown() {
        assert_eq!(SensorRecord::default().entity_id(), "unknown");

        let empty = SensorRecord {
            farm_id: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(empty.entity_id(), "unknown");

        let named = SensorRecord {
            farm_id: Some("FARM_7".to_string()),
            ..Default::default()
        };
        assert_eq!(named.entity_id(), "FARM_7");
    }

    #[test]
    fn deserializes_partial_readings() {
        let rec: SensorRecord =
            serde_json::from_str(r#"{"farm_id":"FARM_1","soil_moisture":22.5,"ph":6.1}"#).unwrap();
        assert_eq!(rec.entity_id(), "FARM_1");
        assert_eq!(rec.soil_moisture, Some(22.5));
        assert_eq!(rec.ph, Some(6.1));
        assert_eq!(rec.air_temperature, None);
    }

    #[test]
    fn absent_fields_stay_absent_on_the_wire() {
        let rec = SensorRecord {
            farm_id: Some("FARM_1".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_string(&rec).unwrap();
        assert_eq!(json, r#"{"farm_id":"FARM_1"}"#);
    }
}
