//! Delay classification over mapped services.

use crate::domain::{StatusKind, TrainService};

/// Filter services to those delayed beyond `threshold_mins`.
///
/// Cancelled services are always included. A "Delayed" status with no
/// usable clock estimate is included too, since its size is unknown.
/// Everything else is included when expected minus scheduled exceeds the
/// threshold. Order is preserved, so applying the filter twice gives the
/// same list.
pub fn check_service_delays(services: &[TrainService], threshold_mins: i64) -> Vec<TrainService> {
    services
        .iter()
        .filter(|s| exceeds_threshold(s, threshold_mins))
        .cloned()
        .collect()
}

fn exceeds_threshold(service: &TrainService, threshold_mins: i64) -> bool {
    match service.status_kind() {
        Some(StatusKind::Cancelled) => true,
        Some(StatusKind::Delayed) => match service.delay_minutes() {
            // No clock estimate: expected was defaulted to scheduled
            Some(0) | None => true,
            Some(mins) => mins > threshold_mins,
        },
        _ => service
            .delay_minutes()
            .is_some_and(|mins| mins > threshold_mins),
    }
}

/// Whether a departure counts towards a station's delayed total.
///
/// A recognised status decides on its own; anything else falls back to
/// comparing times against `threshold_mins`.
pub fn is_delayed(service: &TrainService, threshold_mins: i64) -> bool {
    match service.status_kind() {
        Some(StatusKind::Cancelled | StatusKind::Delayed) => true,
        Some(StatusKind::OnTime) => false,
        Some(StatusKind::Other) | None => service
            .delay_minutes()
            .is_some_and(|mins| mins > threshold_mins),
    }
}
