use crate::model::Coordinates;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance in kilometres.
pub fn haversine_km(from: Coordinates, to: Coordinates) -> f64 {
    let phi1 = from.lat.to_radians();
    let phi2 = to.lat.to_radians();
    let d_phi = (to.lat - from.lat).to_radians();
    let d_lambda = (to.lon - from.lon).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// Rough door-to-door minutes without routing: the assumed speed grows with
/// the distance (15, 25, 45, then 60 km/h).
pub fn travel_time_minutes(distance_km: f64) -> f64 {
    let speed_kmh = if distance_km <= 2.0 {
        15.0
    } else if distance_km <= 10.0 {
        25.0
    } else if distance_km <= 30.0 {
        45.0
    } else {
        60.0
    };
    distance_km / speed_kmh * 60.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn haversine_is_zero_for_same_point_and_symmetric() {
        let berlin = Coordinates::new(52.52, 13.405);
        let paris = Coordinates::new(48.8566, 2.3522);

        assert_eq!(haversine_km(berlin, berlin), 0.0);
        let there = haversine_km(berlin, paris);
        let back = haversine_km(paris, berlin);
        assert!((there - back).abs() < 1e-9);
        assert!((there - 878.0).abs() < 5.0, "distance = {there}");
    }

    #[test]
    fn travel_time_uses_distance_bands() {
        let cases = [(2.0, 8.0), (5.0, 12.0), (30.0, 40.0), (120.0, 120.0)];
        for (distance_km, minutes) in cases {
            let actual = travel_time_minutes(distance_km);
            assert!((actual - minutes).abs() < 1e-9, "{distance_km} km -> {actual}");
        }
    }
}
