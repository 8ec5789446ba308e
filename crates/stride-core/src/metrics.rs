//! Derived running metrics and their display formats.

/// Calorie estimate used when no profile value is configured.
pub const DEFAULT_KCAL_PER_KM: f64 = 65.0;

/// Average speed in m/s. The duration is clamped to at least one second.
pub fn average_speed(distance_m: f64, duration_secs: u64) -> f64 {
    distance_m / duration_secs.max(1) as f64
}

/// Meters per second to kilometers per hour.
pub fn mps_to_kmh(speed_mps: f64) -> f64 {
    speed_mps * 3.6
}

/// Seconds per kilometer, or `None` until some distance has been covered.
pub fn pace_secs_per_km(distance_m: f64, duration_secs: u64) -> Option<f64> {
    if distance_m <= 0.0 || duration_secs == 0 {
        return None;
    }
    let pace = duration_secs as f64 / (distance_m / 1000.0);
    pace.is_finite().then_some(pace)
}

/// Pace as `m:ss` per kilometer, `"0:00"` when undefined.
pub fn format_pace(distance_m: f64, duration_secs: u64) -> String {
    match pace_secs_per_km(distance_m, duration_secs) {
        Some(pace) => {
            let total = pace.floor() as u64;
            format!("{}:{:02}", total / 60, total % 60)
        }
        None => "0:00".into(),
    }
}

/// `h:mm:ss` from one hour up, `m:ss` below.
pub fn format_duration(secs: u64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}

/// Rough energy estimate: flat cost per kilometer.
pub fn estimated_calories(distance_m: f64, kcal_per_km: f64) -> u32 {
    (distance_m / 1000.0 * kcal_per_km).round().max(0.0) as u32
}
