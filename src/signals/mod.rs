mod surge;
mod weather;

pub use {
    surge::{NeutralSurge, SurgeProvider, SurgeRecord, SurgeTable},
    weather::{NeutralWeather, WeatherCondition, WeatherModel, WeatherProvider, WeatherRecord},
};
