//! Open-Meteo hourly forecast source.
//!
//! A free-text city is resolved through the geocoding endpoint first; a
//! `lat,lon` entity skips that step. Unknown cities fall back to the
//! configured default coordinates. The forecast yields one series per
//! metric, with the requested metric listed first.

use chrono::NaiveDateTime;
use serde::Deserialize;
use tracing::{info, warn};

use super::http::{decode_json, HttpClient};
use super::SourceAdapter;
use crate::config::{BreakerConfig, HttpConfig, WeatherConfig};
use crate::domain::{
    DataPoint, Dataset, Mode, RequestParameters, Series, WeatherMetric, MAX_FORECAST_DAYS,
};
use crate::error::FetchError;

/// Hourly variables requested from the forecast endpoint.
const HOURLY_VARIABLES: &str = "temperature_2m,relative_humidity_2m,precipitation";
const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    /// Absent (not empty) when nothing matched.
    #[serde(default)]
    results: Vec<GeoPlace>,
}

#[derive(Debug, Deserialize)]
struct GeoPlace {
    name: String,
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    hourly: HourlyBlock,
}

#[derive(Debug, Deserialize)]
struct HourlyBlock {
    time: Vec<String>,
    temperature_2m: Vec<Option<f64>>,
    relative_humidity_2m: Vec<Option<f64>>,
    precipitation: Vec<Option<f64>>,
}

/// A place the forecast is requested for.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLocation {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

pub struct OpenMeteoSource {
    http: HttpClient,
    forecast_url: String,
    geocoding_url: String,
    fallback: ResolvedLocation,
}

impl OpenMeteoSource {
    pub fn new(
        config: &WeatherConfig,
        http: &HttpConfig,
        breaker: &BreakerConfig,
    ) -> Result<Self, FetchError> {
        Ok(Self {
            http: HttpClient::with_breaker_config(http, breaker)?,
            forecast_url: config.forecast_url.clone(),
            geocoding_url: config.geocoding_url.clone(),
            fallback: ResolvedLocation {
                name: config.default_location.clone(),
                latitude: config.fallback_latitude,
                longitude: config.fallback_longitude,
            },
        })
    }

    fn resolve(&self, location: &str) -> Result<ResolvedLocation, FetchError> {
        if let Some((latitude, longitude)) = parse_coordinates(location) {
            return Ok(ResolvedLocation {
                name: format!("{latitude:.4},{longitude:.4}"),
                latitude,
                longitude,
            });
        }

        let query = [
            ("name", location.to_string()),
            ("count", "1".to_string()),
            ("language", "en".to_string()),
            ("format", "json".to_string()),
        ];
        let body = self.http.get_text(&self.geocoding_url, &query)?;
        match parse_geocoding(&body)? {
            Some(place) => Ok(place),
            None => {
                warn!(
                    location,
                    fallback = %self.fallback.name,
                    "location not found, using fallback coordinates"
                );
                Ok(self.fallback.clone())
            }
        }
    }
}

impl SourceAdapter for OpenMeteoSource {
    fn name(&self) -> &str {
        "open-meteo"
    }

    fn mode(&self) -> Mode {
        Mode::Weather
    }

    fn fetch(&self, params: &RequestParameters) -> Result<Dataset, FetchError> {
        let place = self.resolve(&params.location)?;
        let query = forecast_query(&place, params.days);
        let body = self.http.get_text(&self.forecast_url, &query)?;
        let dataset = parse_forecast(&body, params.weather_metric, &place.name)?;
        info!(
            location = %place.name,
            points = dataset.point_count(),
            "weather dataset built"
        );
        Ok(dataset)
    }

    fn is_available(&self) -> bool {
        self.http.breaker().is_allowed()
    }
}

/// Forecast query for `place`. Days beyond the provider's horizon are
/// clamped rather than sent, since the endpoint rejects them.
pub fn forecast_query(place: &ResolvedLocation, days: u32) -> Vec<(&'static str, String)> {
    vec![
        ("latitude", place.latitude.to_string()),
        ("longitude", place.longitude.to_string()),
        ("hourly", HOURLY_VARIABLES.to_string()),
        ("forecast_days", days.clamp(1, MAX_FORECAST_DAYS).to_string()),
        ("timezone", "auto".to_string()),
    ]
}

/// Parse an explicit `lat,lon` pair. Out-of-range values are not coordinates.
pub fn parse_coordinates(input: &str) -> Option<(f64, f64)> {
    let (lat, lon) = input.split_once(',')?;
    let lat: f64 = lat.trim().parse().ok()?;
    let lon: f64 = lon.trim().parse().ok()?;
    ((-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)).then_some((lat, lon))
}

fn parse_geocoding(body: &str) -> Result<Option<ResolvedLocation>, FetchError> {
    let resp: GeocodingResponse = decode_json(body, "geocoding")?;
    Ok(resp.results.into_iter().next().map(|p| ResolvedLocation {
        name: match p.country {
            Some(country) if !country.is_empty() => format!("{}, {country}", p.name),
            _ => p.name,
        },
        latitude: p.latitude,
        longitude: p.longitude,
    }))
}

/// Decode a forecast body into a dataset with one series per metric.
///
/// Hourly times carry no offset (`timezone=auto` makes them location-local);
/// they are read as UTC wall-clock, which keeps ordering intact. Null values
/// are skipped; a metric with no values at all is recorded as skipped.
pub fn parse_forecast(
    body: &str,
    primary: WeatherMetric,
    location: &str,
) -> Result<Dataset, FetchError> {
    let resp: ForecastResponse = decode_json(body, "forecast")?;
    let hourly = resp.hourly;
    let n = hourly.time.len();
    for (name, len) in [
        ("temperature_2m", hourly.temperature_2m.len()),
        ("relative_humidity_2m", hourly.relative_humidity_2m.len()),
        ("precipitation", hourly.precipitation.len()),
    ] {
        if len != n {
            return Err(FetchError::Schema(format!(
                "hourly.{name} has {len} values for {n} timestamps"
            )));
        }
    }

    let times = hourly
        .time
        .iter()
        .map(|t| {
            NaiveDateTime::parse_from_str(t, TIME_FORMAT)
                .map(|dt| dt.and_utc())
                .map_err(|e| FetchError::Schema(format!("bad hourly time '{t}': {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let column = |metric: WeatherMetric| match metric {
        WeatherMetric::Temperature => &hourly.temperature_2m,
        WeatherMetric::Humidity => &hourly.relative_humidity_2m,
        WeatherMetric::Precipitation => &hourly.precipitation,
    };

    let order = std::iter::once(primary).chain(WeatherMetric::ALL.into_iter().filter(|m| *m != primary));

    let mut dataset = Dataset::new(Mode::Weather).with_location(location);
    for metric in order {
        let points: Vec<DataPoint> = times
            .iter()
            .zip(column(metric))
            .filter_map(|(ts, v)| v.map(|v| DataPoint::new(*ts, v)))
            .collect();
        let series = Series::canonicalize(metric.key(), metric.label(), metric.unit(), points);
        if series.is_empty() {
            dataset.skip(metric.key(), "no values in forecast");
        } else {
            dataset.insert(series);
        }
    }

    if dataset.is_empty() {
        return Err(FetchError::EmptyResult {
            entity: location.to_string(),
        });
    }
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FORECAST: &str = r#"{
        "latitude": 40.71,
        "longitude": -74.0,
        "hourly": {
            "time": ["2024-01-01T00:00", "2024-01-01T01:00", "2024-01-01T02:00"],
            "temperature_2m": [1.5, 2.0, null],
            "relative_humidity_2m": [80, 82, 85],
            "precipitation": [0.0, 0.2, 0.1]
        }
    }"#;

    #[test]
    fn primary_metric_comes_first() {
        let ds = parse_forecast(FORECAST, WeatherMetric::Humidity, "New York").unwrap();
        assert_eq!(ds.entity_ids(), vec!["humidity", "temperature", "precipitation"]);
        assert_eq!(ds.location(), Some("New York"));
        assert_eq!(ds.get("humidity").unwrap().unit(), "%");
    }

    #[test]
    fn nulls_are_skipped() {
        let ds = parse_forecast(FORECAST, WeatherMetric::Temperature, "x").unwrap();
        assert_eq!(ds.get("temperature").unwrap().values(), vec![1.5, 2.0]);
        assert_eq!(ds.get("precipitation").unwrap().len(), 3);
    }

    #[test]
    fn mismatched_lengths_are_schema_error() {
        let body = r#"{"hourly": {
            "time": ["2024-01-01T00:00", "2024-01-01T01:00"],
            "temperature_2m": [1.0],
            "relative_humidity_2m": [1.0, 2.0],
            "precipitation": [0.0, 0.0]
        }}"#;
        assert!(matches!(
            parse_forecast(body, WeatherMetric::Temperature, "x"),
            Err(FetchError::Schema(_))
        ));
    }

    #[test]
    fn bad_time_is_schema_error() {
        let body = r#"{"hourly": {
            "time": ["yesterday"],
            "temperature_2m": [1.0],
            "relative_humidity_2m": [1.0],
            "precipitation": [0.0]
        }}"#;
        assert!(matches!(
            parse_forecast(body, WeatherMetric::Temperature, "x"),
            Err(FetchError::Schema(_))
        ));
    }

    #[test]
    fn empty_forecast_is_empty_result() {
        let body = r#"{"hourly": {
            "time": [], "temperature_2m": [], "relative_humidity_2m": [], "precipitation": []
        }}"#;
        assert!(matches!(
            parse_forecast(body, WeatherMetric::Temperature, "Nowhere"),
            Err(FetchError::EmptyResult { .. })
        ));
    }

    #[test]
    fn coordinates() {
        assert_eq!(parse_coordinates("40.7128, -74.0060"), Some((40.7128, -74.006)));
        assert_eq!(parse_coordinates("New York"), None);
        assert_eq!(parse_coordinates("91,0"), None);
        assert_eq!(parse_coordinates("Paris, France"), None);
    }

    #[test]
    fn geocoding_without_results_is_not_an_error() {
        assert_eq!(parse_geocoding(r#"{"generationtime_ms": 0.5}"#).unwrap(), None);
        let place = parse_geocoding(
            r#"{"results": [{"name": "Tokyo", "latitude": 35.69, "longitude": 139.69, "country": "Japan"}]}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(place.name, "Tokyo, Japan");
        assert_eq!(place.latitude, 35.69);
    }

    fn query_value(query: &[(&str, String)], key: &str) -> String {
        query
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.clone())
            .unwrap()
    }

    #[test]
    fn forecast_days_capped_at_provider_horizon() {
        let place = ResolvedLocation {
            name: "Tokyo, Japan".into(),
            latitude: 35.69,
            longitude: 139.69,
        };
        assert_eq!(query_value(&forecast_query(&place, 7), "forecast_days"), "7");
        assert_eq!(query_value(&forecast_query(&place, 16), "forecast_days"), "16");
        assert_eq!(query_value(&forecast_query(&place, 30), "forecast_days"), "16");
        assert_eq!(query_value(&forecast_query(&place, 30), "latitude"), "35.69");
        assert_eq!(query_value(&forecast_query(&place, 30), "timezone"), "auto");
    }
}
