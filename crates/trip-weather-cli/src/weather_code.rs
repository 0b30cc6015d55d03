/// Short English label for a WMO weather interpretation code.
pub fn summary_en(code: i32) -> &'static str {
    match code {
        0 => "clear sky",
        1 => "mainly clear",
        2 => "partly cloudy",
        3 => "overcast",
        45 | 48 => "fog",
        51 | 53 | 55 | 56 | 57 => "drizzle",
        61 | 63 | 65 | 66 | 67 => "rain",
        71 | 73 | 75 | 77 => "snow",
        80..=82 => "rain showers",
        85 | 86 => "snow showers",
        95 | 96 | 99 => "thunderstorm",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weather_code_maps_clear_sky() {
        assert_eq!(summary_en(0), "clear sky");
    }

    #[test]
    fn weather_code_maps_rain_family() {
        assert_eq!(summary_en(63), "rain");
        assert_eq!(summary_en(81), "rain showers");
    }

    #[test]
    fn summary_mapping_handles_unknown_code() {
        assert_eq!(summary_en(999), "unknown");
    }
}
