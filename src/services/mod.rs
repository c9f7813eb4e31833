pub mod enrich;
pub mod geo;
pub mod openweather;
pub mod strava;
pub mod wind;
