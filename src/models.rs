//! Weather payload models for the OpenWeatherMap API
//!
//! These mirror the subset of the API responses the application actually
//! displays. Unknown fields are ignored so the cache keeps working when the
//! upstream API grows new fields.

use serde::{Deserialize, Serialize};

/// A single weather descriptor within a conditions or forecast payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherSummary {
    /// Numeric condition code (group 2xx thunderstorm, 5xx rain, ...)
    pub id: u32,
    /// Short condition name, e.g. "Clouds"
    pub main: String,
    /// Longer human-readable description
    pub description: String,
}

/// Temperature and humidity block of a current-conditions payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thermals {
    /// Current temperature in the requested units
    pub temp: f64,
    /// Feels-like temperature
    pub feels_like: Option<f64>,
    /// Daily minimum temperature
    pub temp_min: Option<f64>,
    /// Daily maximum temperature
    pub temp_max: Option<f64>,
    /// Relative humidity percentage
    pub humidity: Option<f64>,
}

/// Current weather conditions for one location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentConditions {
    /// Active weather descriptors (usually one)
    pub weather: Vec<WeatherSummary>,
    /// Temperature readings
    pub main: Thermals,
    /// Location name reported by the API
    pub name: Option<String>,
}

/// Temperature range for one forecast day
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastTemps {
    /// Daily minimum temperature
    pub min: f64,
    /// Daily maximum temperature
    pub max: f64,
}

/// One day of a daily forecast
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastDay {
    /// Forecast time as a unix timestamp
    pub dt: i64,
    /// Temperature range for the day
    pub temp: ForecastTemps,
    /// Weather descriptors for the day
    pub weather: Vec<WeatherSummary>,
}

/// Multi-day forecast for one location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Forecast {
    /// Daily entries, one per requested day
    pub list: Vec<ForecastDay>,
}

/// Maps an OpenWeatherMap condition code to an icon file name.
///
/// Code ranges follow the API's condition groups: 2xx thunderstorm, 5xx
/// rain, 6xx snow, 7xx atmosphere, 80x clouds.
pub fn weather_icon(id: u32) -> &'static str {
    match id {
        200..=232 => "art_storm.png",
        501..=511 => "art_rain.png",
        500 | 520..=531 => "art_light_rain.png",
        600..=622 => "art_snow.png",
        801..=804 => "art_clouds.png",
        741 | 761 => "art_fog.png",
        _ => "art_clear.png",
    }
}
