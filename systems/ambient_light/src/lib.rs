#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Ambient daylight model based on the real position of the sun.
//!
//! Visibility on dynamically lit floors follows the actual sky outside:
//! full radius during the day, minimum radius at night, and a linear ramp
//! through civil twilight. The model computes the apparent solar altitude
//! from low-accuracy series, locates the day's twilight and horizon
//! crossings by bisection to minute precision, and maps the current
//! moment onto a [0, 1] intensity.

use time::{Duration, OffsetDateTime, Time};

/// Solar altitude marking the edge of civil twilight, in degrees.
const TWILIGHT_ALTITUDE: f64 = -6.0;

/// Solar altitude of the geometric horizon, in degrees.
const HORIZON_ALTITUDE: f64 = 0.0;

/// Crossing searches stop once the bracket shrinks below one minute.
const CROSSING_PRECISION: Duration = Duration::minutes(1);

fn julian_day(moment: OffsetDateTime) -> f64 {
    let seconds = moment.unix_timestamp() as f64 + f64::from(moment.nanosecond()) * 1e-9;
    seconds / 86_400.0 + 2_440_587.5
}

/// Apparent solar altitude in degrees at a moment and location.
///
/// Latitude and longitude are in degrees, east and north positive. The
/// series for the solar apparent place and sidereal time are accurate to
/// a few hundredths of a degree, well below the one-minute precision of
/// the crossing search built on top.
#[must_use]
pub fn solar_altitude(moment: OffsetDateTime, latitude: f64, longitude: f64) -> f64 {
    let jd = julian_day(moment);
    let t = (jd - 2_451_545.0) / 36_525.0;

    let mean_longitude = 280.466_46 + 36_000.769_83 * t + 0.000_303_2 * t * t;
    let mean_anomaly = (357.529_11 + 35_999.050_29 * t - 0.000_153_7 * t * t).to_radians();
    let center = (1.914_602 - 0.004_817 * t - 0.000_014 * t * t) * mean_anomaly.sin()
        + (0.019_993 - 0.000_101 * t) * (2.0 * mean_anomaly).sin()
        + 0.000_289 * (3.0 * mean_anomaly).sin();
    let true_longitude = mean_longitude + center;

    let node = (125.04 - 1_934.136 * t).to_radians();
    let apparent_longitude = (true_longitude - 0.005_69 - 0.004_78 * node.sin()).to_radians();
    let obliquity = (23.439_291 - 0.013_004_2 * t + 0.002_56 * node.cos()).to_radians();

    let right_ascension = (obliquity.cos() * apparent_longitude.sin())
        .atan2(apparent_longitude.cos())
        .to_degrees();
    let declination = (obliquity.sin() * apparent_longitude.sin()).asin();

    let sidereal = 280.460_618_37
        + 360.985_647_366_29 * (jd - 2_451_545.0)
        + 0.000_387_933 * t * t
        - t * t * t / 38_710_000.0;
    let hour_angle = (sidereal + longitude - right_ascension).to_radians();

    let latitude = latitude.to_radians();
    let sine = latitude.sin() * declination.sin()
        + latitude.cos() * declination.cos() * hour_angle.cos();
    sine.clamp(-1.0, 1.0).asin().to_degrees()
}

/// Ambient daylight intensity in [0, 1] at a local moment and location.
///
/// The moment's UTC offset anchors the local day: midnight and noon are
/// taken at that one offset for the entire date, so on a date whose
/// civil offset changes (a DST transition) the day anchors follow the
/// caller's offset rather than the shifting wall clock. Callers must
/// pass the offset in effect at the queried moment. Intensity is 0
/// before dawn and after dusk, 1 between sunrise and sunset, and ramps
/// linearly through the twilight bands. At polar latitudes a missing
/// crossing (or dawn after dusk) collapses the day to all-light or
/// all-dark based on the altitude at local noon.
#[must_use]
pub fn intensity(local_now: OffsetDateTime, latitude: f64, longitude: f64) -> f64 {
    let midnight = local_now.replace_time(Time::MIDNIGHT);
    let noon = midnight + Duration::hours(12);
    let next_midnight = midnight + Duration::days(1);

    let dawn = crossing(TWILIGHT_ALTITUDE, midnight, noon, false, latitude, longitude);
    let dusk = crossing(TWILIGHT_ALTITUDE, noon, next_midnight, true, latitude, longitude);

    let (Some(dawn), Some(dusk)) = (dawn, dusk) else {
        return polar_intensity(noon, latitude, longitude);
    };
    if dawn > dusk {
        return polar_intensity(noon, latitude, longitude);
    }
    if local_now < dawn || local_now >= dusk {
        return 0.0;
    }

    // A day can clear -6 degrees without ever clearing the horizon; the
    // missing crossing degenerates to a ramp peaking at noon.
    let sunrise =
        crossing(HORIZON_ALTITUDE, midnight, noon, false, latitude, longitude).unwrap_or(noon);
    let sunset = crossing(HORIZON_ALTITUDE, noon, next_midnight, true, latitude, longitude)
        .unwrap_or(noon);

    if local_now < sunrise {
        ramp_fraction(dawn, sunrise, local_now)
    } else if local_now < sunset {
        1.0
    } else {
        1.0 - ramp_fraction(sunset, dusk, local_now)
    }
}

/// Linear interpolation between the minimum and maximum visibility radii.
#[must_use]
pub fn scaled_radius(intensity: f64, minimum: f64, maximum: f64) -> f64 {
    minimum + (maximum - minimum) * intensity.clamp(0.0, 1.0)
}

fn polar_intensity(noon: OffsetDateTime, latitude: f64, longitude: f64) -> f64 {
    if solar_altitude(noon, latitude, longitude) > TWILIGHT_ALTITUDE {
        1.0
    } else {
        0.0
    }
}

/// Locates the moment the altitude crosses `target` within the bracket.
///
/// `after_noon` selects the crossing direction: rising toward noon in the
/// morning half, falling away from it in the evening half. Returns `None`
/// when the bracket never crosses the target.
fn crossing(
    target: f64,
    from: OffsetDateTime,
    to: OffsetDateTime,
    after_noon: bool,
    latitude: f64,
    longitude: f64,
) -> Option<OffsetDateTime> {
    let start = solar_altitude(from, latitude, longitude) - target;
    let end = solar_altitude(to, latitude, longitude) - target;
    if start * end > 0.0 {
        return None;
    }

    let mut low = from;
    let mut high = to;
    while high - low > CROSSING_PRECISION {
        let mid = low + (high - low) / 2;
        if (solar_altitude(mid, latitude, longitude) > target) == after_noon {
            low = mid;
        } else {
            high = mid;
        }
    }
    Some(low)
}

fn ramp_fraction(start: OffsetDateTime, end: OffsetDateTime, moment: OffsetDateTime) -> f64 {
    let span = (end - start).as_seconds_f64();
    if span <= 0.0 {
        return 1.0;
    }
    ((moment - start).as_seconds_f64() / span).clamp(0.0, 1.0)
}
