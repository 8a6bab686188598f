//! Conversion from Darwin board entries to [`TrainService`] records.
//!
//! Darwin reports arrivals in `sta`/`eta` and departures in `std`/`etd`;
//! estimates may be a clock time or a word ("On time", "Delayed",
//! "Cancelled"). This module folds all of that into the flat record shape.

use serde::Deserialize;

use crate::domain::{ClockTime, Direction, TrainService};

use super::types::{RawService, ServiceItem, ServiceLocation};

/// Error during raw record to domain conversion.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversionError {
    /// Record is not an object or has fields of the wrong type
    #[error("malformed service record: {0}")]
    Malformed(String),

    /// Missing or empty required field
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// Failed to parse a time field
    #[error("invalid time in {field}: {value:?}")]
    InvalidTime { field: &'static str, value: String },
}

/// What Darwin said about when the train will actually run.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Estimate<'a> {
    /// A clock time such as "10:15".
    Clock(ClockTime),
    /// A word such as "On time" or "Delayed".
    Text(&'a str),
    /// No estimate given.
    Absent,
}

/// Convert one raw board entry into a [`TrainService`].
///
/// The input is borrowed and never modified. Required fields (service ID,
/// scheduled time, operator, origin, destination) must be present and
/// non-empty; the error names the upstream field that was not.
pub fn map_record(raw: &RawService, direction: Direction) -> Result<TrainService, ConversionError> {
    let item = ServiceItem::deserialize(&raw.0)
        .map_err(|e| ConversionError::Malformed(e.to_string()))?;

    let service_id = required(item.service_id.as_deref(), "serviceID")?;

    let (scheduled_field, scheduled, estimate) = match direction {
        Direction::Arrivals => ("sta", item.sta.as_deref(), item.eta.as_deref()),
        Direction::Departures => ("std", item.std.as_deref(), item.etd.as_deref()),
    };

    let scheduled = required(scheduled, scheduled_field)?;
    let scheduled = ClockTime::parse_hhmm(scheduled).map_err(|_| ConversionError::InvalidTime {
        field: scheduled_field,
        value: scheduled.to_string(),
    })?;

    let operator = required(item.operator.as_deref(), "operator")?;
    let origin = join_locations(item.origin.as_deref()).ok_or(ConversionError::MissingField("origin"))?;
    let destination = join_locations(item.destination.as_deref())
        .ok_or(ConversionError::MissingField("destination"))?;

    let estimate = parse_estimate(estimate);

    let expected_time = match estimate {
        Estimate::Clock(t) => t,
        Estimate::Text(_) | Estimate::Absent => scheduled,
    };

    let status = if item.is_cancelled == Some(true) {
        Some("Cancelled".to_string())
    } else {
        match estimate {
            Estimate::Text(text) => Some(text.to_string()),
            Estimate::Clock(_) | Estimate::Absent => None,
        }
    };

    Ok(TrainService {
        scheduled_time: scheduled.to_string(),
        expected_time: expected_time.to_string(),
        platform: non_empty(item.platform.as_deref()).map(str::to_string),
        operator: operator.to_string(),
        origin,
        destination,
        service_id: service_id.to_string(),
        status,
    })
}

/// Parse an estimate field, which may be a time or a status string.
fn parse_estimate(raw: Option<&str>) -> Estimate<'_> {
    match non_empty(raw) {
        None => Estimate::Absent,
        Some(text) => match ClockTime::parse_hhmm(text) {
            Ok(t) => Estimate::Clock(t),
            Err(_) => Estimate::Text(text),
        },
    }
}

/// Join location names; split and joined services list several.
fn join_locations(locations: Option<&[ServiceLocation]>) -> Option<String> {
    let names: Vec<&str> = locations?
        .iter()
        .filter_map(|l| non_empty(l.location_name.as_deref()))
        .collect();

    if names.is_empty() {
        None
    } else {
        Some(names.join(" & "))
    }
}

fn required<'a>(value: Option<&'a str>, field: &'static str) -> Result<&'a str, ConversionError> {
    non_empty(value).ok_or(ConversionError::MissingField(field))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn departure(overrides: serde_json::Value) -> RawService {
        let mut base = json!({
            "serviceID": "svc-1",
            "std": "10:45",
            "etd": "On time",
            "platform": "4",
            "operator": "Avanti West Coast",
            "origin": [{"locationName": "London Euston", "crs": "EUS"}],
            "destination": [{"locationName": "Manchester Piccadilly", "crs": "MAN"}]
        });
        if let (Some(base), Some(overrides)) = (base.as_object_mut(), overrides.as_object()) {
            for (k, v) in overrides {
                if v.is_null() {
                    base.remove(k);
                } else {
                    base.insert(k.clone(), v.clone());
                }
            }
        }
        RawService(base)
    }

    #[test]
    fn convert_simple_departure() {
        let service = map_record(&departure(json!({})), Direction::Departures).unwrap();

        assert_eq!(service.service_id, "svc-1");
        assert_eq!(service.scheduled_time, "10:45");
        assert_eq!(service.expected_time, "10:45");
        assert_eq!(service.platform.as_deref(), Some("4"));
        assert_eq!(service.operator, "Avanti West Coast");
        assert_eq!(service.origin, "London Euston");
        assert_eq!(service.destination, "Manchester Piccadilly");
        assert_eq!(service.status.as_deref(), Some("On time"));
    }

    #[test]
    fn convert_arrival_reads_sta_eta() {
        let raw = departure(json!({"std": null, "etd": null, "sta": "09:58", "eta": "10:03"}));
        let service = map_record(&raw, Direction::Arrivals).unwrap();

        assert_eq!(service.scheduled_time, "09:58");
        assert_eq!(service.expected_time, "10:03");
        assert_eq!(service.status, None);

        // The same record has no departure time
        assert_eq!(
            map_record(&raw, Direction::Departures),
            Err(ConversionError::MissingField("std"))
        );
    }

    #[test]
    fn clock_estimate_is_used() {
        let raw = departure(json!({"etd": "10:52"}));
        let service = map_record(&raw, Direction::Departures).unwrap();
        assert_eq!(service.expected_time, "10:52");
        assert_eq!(service.status, None);
    }

    #[test]
    fn missing_estimate_defaults_to_scheduled() {
        let raw = departure(json!({"etd": null}));
        let service = map_record(&raw, Direction::Departures).unwrap();
        assert_eq!(service.expected_time, service.scheduled_time);
        assert_eq!(service.status, None);
    }

    #[test]
    fn textual_estimates_become_status() {
        for text in ["Delayed", "Cancelled", "No report"] {
            let raw = departure(json!({"etd": text}));
            let service = map_record(&raw, Direction::Departures).unwrap();
            assert_eq!(service.expected_time, "10:45");
            assert_eq!(service.status.as_deref(), Some(text));
        }
    }

    #[test]
    fn cancelled_flag_overrides_status() {
        let raw = departure(json!({"etd": "10:50", "isCancelled": true}));
        let service = map_record(&raw, Direction::Departures).unwrap();
        assert_eq!(service.status.as_deref(), Some("Cancelled"));
        assert!(service.is_cancelled());
    }

    #[test]
    fn absent_platform_stays_absent() {
        let raw = departure(json!({"platform": null}));
        assert_eq!(map_record(&raw, Direction::Departures).unwrap().platform, None);

        let raw = departure(json!({"platform": "  "}));
        assert_eq!(map_record(&raw, Direction::Departures).unwrap().platform, None);
    }

    #[test]
    fn missing_required_fields_are_named() {
        let cases = [
            ("serviceID", "serviceID"),
            ("std", "std"),
            ("operator", "operator"),
            ("origin", "origin"),
            ("destination", "destination"),
        ];
        for (key, field) in cases {
            let raw = departure(json!({ key: null }));
            assert_eq!(
                map_record(&raw, Direction::Departures),
                Err(ConversionError::MissingField(field)),
                "removing {key}"
            );
        }
    }

    #[test]
    fn empty_required_field_counts_as_missing() {
        let raw = departure(json!({"operator": ""}));
        assert_eq!(
            map_record(&raw, Direction::Departures),
            Err(ConversionError::MissingField("operator"))
        );

        let raw = departure(json!({"destination": []}));
        assert_eq!(
            map_record(&raw, Direction::Departures),
            Err(ConversionError::MissingField("destination"))
        );
    }

    #[test]
    fn invalid_scheduled_time() {
        let raw = departure(json!({"std": "quarter to"}));
        assert_eq!(
            map_record(&raw, Direction::Departures),
            Err(ConversionError::InvalidTime {
                field: "std",
                value: "quarter to".into()
            })
        );
    }

    #[test]
    fn wrong_types_are_malformed() {
        let raw = departure(json!({"serviceID": 42}));
        assert!(matches!(
            map_record(&raw, Direction::Departures),
            Err(ConversionError::Malformed(_))
        ));

        let raw = RawService(json!("not an object"));
        assert!(matches!(
            map_record(&raw, Direction::Departures),
            Err(ConversionError::Malformed(_))
        ));
    }

    #[test]
    fn multiple_destinations_are_joined() {
        let raw = departure(json!({
            "destination": [
                {"locationName": "Holyhead", "crs": "HHD"},
                {"locationName": "Llandudno", "crs": "LLD"}
            ]
        }));
        let service = map_record(&raw, Direction::Departures).unwrap();
        assert_eq!(service.destination, "Holyhead & Llandudno");
    }

    #[test]
    fn input_is_not_modified() {
        let raw = departure(json!({"etd": null, "platform": null}));
        let before = raw.clone();
        let _ = map_record(&raw, Direction::Departures);
        assert_eq!(raw, before);
    }
}
