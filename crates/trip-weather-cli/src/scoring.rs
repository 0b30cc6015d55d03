use crate::geo::{haversine_km, travel_time_minutes};
use crate::model::{Coordinates, Spot, WeatherProfile};

const BASE_SCORE: f64 = 70.0;

/// Transparent baseline score in `[0, 100]`: closer is better, rain, heat
/// and strong wind cost points, mild temperatures earn some.
pub fn heuristic_score(distance_km: f64, weather: Option<&WeatherProfile>, activity: &str) -> f64 {
    let mut score = BASE_SCORE;
    score -= (distance_km * 1.5).min(35.0);

    let rainy_days = weather.map(|weather| weather.rainy_days.unwrap_or(0));
    if let Some(weather) = weather {
        score -= (f64::from(rainy_days.unwrap_or(0)) * 3.0).min(20.0);

        if let Some(temp_max) = weather.temp_max_c {
            if temp_max >= 33.0 {
                score -= 10.0;
            } else if (20.0..=28.0).contains(&temp_max) {
                score += 5.0;
            }
        }

        if weather.wind_max_kmh.is_some_and(|wind| wind >= 45.0)
            && matches!(activity, "beach" | "hiking")
        {
            score -= 8.0;
        }
    }

    match activity {
        "running" => score += 2.0,
        "beach" if rainy_days == Some(0) => score += 5.0,
        _ => {}
    }

    score.clamp(0.0, 100.0)
}

/// Fills distance, travel time and score on every spot and orders them by
/// score, best first. Equal scores keep their input order.
pub fn score_spots(
    origin: Coordinates,
    spots: Vec<Spot>,
    weather: Option<&WeatherProfile>,
) -> Vec<Spot> {
    let mut scored = spots
        .into_iter()
        .map(|mut spot| {
            let distance_km = haversine_km(origin, Coordinates::new(spot.lat, spot.lon));
            let activity = spot.activity.as_deref().unwrap_or("sightseeing");
            spot.score = Some(heuristic_score(distance_km, weather, activity));
            spot.distance_km = Some(distance_km);
            spot.travel_time_min = Some(travel_time_minutes(distance_km));
            spot
        })
        .collect::<Vec<_>>();

    scored.sort_by(|left, right| {
        let left = left.score.unwrap_or(0.0);
        let right = right.score.unwrap_or(0.0);
        right.total_cmp(&left)
    });
    scored
}
