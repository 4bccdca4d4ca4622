// WMO weather interpretation codes as reported by Open-Meteo.
// See https://open-meteo.com/en/docs#weathervariables
const WEATHER_CODES: &[(i32, &str)] = &[
    (0, "Clear sky"),
    (1, "Mainly clear"),
    (2, "Partly cloudy"),
    (3, "Overcast"),
    (45, "Fog"),
    (48, "Depositing rime fog"),
    (51, "Light drizzle"),
    (53, "Moderate drizzle"),
    (55, "Dense drizzle"),
    (61, "Slight rain"),
    (63, "Moderate rain"),
    (65, "Heavy rain"),
    (80, "Slight rain showers"),
    (81, "Moderate rain showers"),
    (82, "Violent rain showers"),
    (95, "Thunderstorm"),
];

pub const UNKNOWN_WEATHER: &str = "Unknown";

/// Returns a short human readable description of a weather code.
///
/// Codes that are not in the table map to `"Unknown"`.
pub fn weather_description(code: i32) -> &'static str {
    WEATHER_CODES
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, description)| *description)
        .unwrap_or(UNKNOWN_WEATHER)
}
