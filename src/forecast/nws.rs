//! Forecast provider backed by the US National Weather Service (`api.weather.gov`).
//!
//! Looking up a forecast takes two requests: `/points/{lat},{lon}` resolves the
//! coordinate to its forecast office grid and returns the hourly forecast URL,
//! which is then fetched. Point lookups change rarely, so their URLs are kept
//! in memory for as long as the response's `Cache-Control: max-age` allows.
//!
//! The hourly response is normalized here and nowhere else: temperatures to
//! °C, wind strings such as `"5 to 10 mph"` to km/h, missing precipitation
//! probability to 0.

use crate::forecast::error::ProviderError;
use crate::forecast::provider::ForecastProvider;
use crate::types::coordinate::Coordinate;
use crate::types::forecast::{ForecastDocument, ForecastPeriod, Wind};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use log::{debug, info, warn};
use reqwest::header::{HeaderMap, ACCEPT, CACHE_CONTROL, RETRY_AFTER};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;

const DEFAULT_BASE_URL: &str = "https://api.weather.gov";
const DEFAULT_USER_AGENT: &str = "routecast/0.1 (route weather engine)";
const GEO_JSON: &str = "application/geo+json";
const DEFAULT_POINT_TTL_HOURS: i64 = 24;
const MPH_TO_KPH: f64 = 1.609_344;
/// Points are looked up at four decimal places; finer input only fragments the
/// point cache.
const POINT_DECIMALS: usize = 4;

#[derive(Debug, Deserialize)]
struct PointsResponse {
    properties: PointsProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PointsProperties {
    forecast_hourly: String,
}

#[derive(Debug, Deserialize)]
struct HourlyForecastResponse {
    properties: HourlyForecastProperties,
}

#[derive(Debug, Deserialize)]
struct HourlyForecastProperties {
    #[serde(default)]
    periods: Vec<NwsPeriod>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NwsPeriod {
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    temperature: Option<f64>,
    #[serde(default)]
    temperature_unit: Option<String>,
    #[serde(default)]
    probability_of_precipitation: Option<QuantValue>,
    #[serde(default)]
    wind_speed: Option<String>,
    #[serde(default)]
    wind_gust: Option<String>,
    #[serde(default)]
    wind_direction: Option<String>,
    #[serde(default)]
    short_forecast: String,
}

#[derive(Debug, Deserialize)]
struct QuantValue {
    value: Option<f64>,
}

pub struct NwsForecastProvider {
    client: Client,
    base_url: String,
    forecast_urls: DashMap<(String, String), (String, DateTime<Utc>)>,
}

impl NwsForecastProvider {
    pub fn new() -> Result<Self, ProviderError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Points the provider at another host serving the same API.
    pub fn with_base_url(base_url: &str) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .user_agent(DEFAULT_USER_AGENT)
            .gzip(true)
            .build()
            .map_err(|e| ProviderError::NetworkRequest(base_url.to_string(), e))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            forecast_urls: DashMap::new(),
        })
    }

    async fn forecast_url(&self, coordinate: Coordinate) -> Result<String, ProviderError> {
        let point = (
            format!("{:.*}", POINT_DECIMALS, coordinate.latitude()),
            format!("{:.*}", POINT_DECIMALS, coordinate.longitude()),
        );
        let now = Utc::now();
        if let Some(cached) = self.forecast_urls.get(&point) {
            let (url, expires_at) = cached.value();
            if now < *expires_at {
                return Ok(url.clone());
            }
        }

        let url = format!("{}/points/{},{}", self.base_url, point.0, point.1);
        let response = self.get(&url).await?;
        let expires_at = point_expires_at(now, response.headers());
        let body: PointsResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(format!("points response from {url}: {e}")))?;

        let forecast_url = body.properties.forecast_hourly;
        debug!("Resolved {} to {}", coordinate, forecast_url);
        self.remember_forecast_url(point, forecast_url.clone(), expires_at, now);
        Ok(forecast_url)
    }

    /// Stores a resolved point, dropping every entry that has already expired.
    fn remember_forecast_url(
        &self,
        point: (String, String),
        forecast_url: String,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) {
        self.forecast_urls.retain(|_, (_, expiry)| now < *expiry);
        self.forecast_urls.insert(point, (forecast_url, expires_at));
    }

    async fn get(&self, url: &str) -> Result<Response, ProviderError> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, GEO_JSON)
            .send()
            .await
            .map_err(|e| ProviderError::NetworkRequest(url.to_string(), e))?;

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok());
            warn!("Rate limited by {}", url);
            return Err(ProviderError::RateLimited {
                url: url.to_string(),
                retry_after_secs,
            });
        }

        match response.error_for_status() {
            Ok(resp) => Ok(resp),
            Err(e) => {
                warn!("HTTP error for {}: {:?}", url, e);
                Err(if let Some(status) = e.status() {
                    ProviderError::HttpStatus {
                        url: url.to_string(),
                        status,
                        source: e,
                    }
                } else {
                    ProviderError::NetworkRequest(url.to_string(), e)
                })
            }
        }
    }
}

#[async_trait]
impl ForecastProvider for NwsForecastProvider {
    async fn fetch(&self, coordinate: Coordinate) -> Result<ForecastDocument, ProviderError> {
        let url = self.forecast_url(coordinate).await?;
        info!("Downloading hourly forecast from {}", url);
        let bytes = self
            .get(&url)
            .await?
            .bytes()
            .await
            .map_err(|e| ProviderError::NetworkRequest(url.clone(), e))?;
        parse_hourly_forecast(&bytes)
    }
}

/// Parses and normalizes an NWS hourly forecast body.
pub(crate) fn parse_hourly_forecast(body: &[u8]) -> Result<ForecastDocument, ProviderError> {
    let response: HourlyForecastResponse = serde_json::from_slice(body)
        .map_err(|e| ProviderError::Malformed(format!("hourly forecast: {e}")))?;

    if response.properties.periods.is_empty() {
        return Err(ProviderError::Malformed(
            "hourly forecast has no periods".to_string(),
        ));
    }

    let periods = response
        .properties
        .periods
        .into_iter()
        .map(normalize_period)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ForecastDocument::new(periods))
}

fn normalize_period(period: NwsPeriod) -> Result<ForecastPeriod, ProviderError> {
    if period.end_time <= period.start_time {
        return Err(ProviderError::Malformed(format!(
            "period ends ({}) before it starts ({})",
            period.end_time, period.start_time
        )));
    }
    let temperature = period.temperature.ok_or_else(|| {
        ProviderError::Malformed(format!("period at {} has no temperature", period.start_time))
    })?;
    let temperature_c = match period.temperature_unit.as_deref() {
        Some("C") => temperature,
        Some("F") | None => (temperature - 32.0) * 5.0 / 9.0,
        Some(other) => {
            return Err(ProviderError::Malformed(format!(
                "unknown temperature unit '{other}'"
            )))
        }
    };
    let precipitation = period
        .probability_of_precipitation
        .and_then(|q| q.value)
        .unwrap_or(0.0)
        .clamp(0.0, 100.0);

    Ok(ForecastPeriod {
        valid_from: period.start_time,
        valid_to: period.end_time,
        temperature_c,
        precipitation_probability_pct: precipitation,
        wind: Wind {
            speed_kph: period.wind_speed.as_deref().and_then(parse_speed_kph).unwrap_or(0.0),
            gust_kph: period.wind_gust.as_deref().and_then(parse_speed_kph),
            direction: period.wind_direction.filter(|d| !d.is_empty()),
        },
        summary: period.short_forecast,
    })
}

/// Parses NWS wind strings: `"10 mph"`, `"5 to 10 mph"`, `"15 km/h"`.
/// Ranges resolve to their upper value.
pub(crate) fn parse_speed_kph(text: &str) -> Option<f64> {
    let upper = text
        .split(|c: char| !(c.is_ascii_digit() || c == '.'))
        .filter_map(|token| token.parse::<f64>().ok())
        .fold(None, |max: Option<f64>, v| Some(max.map_or(v, |m| m.max(v))))?;
    let lower = text.to_ascii_lowercase();
    if lower.contains("km") {
        Some(upper)
    } else if lower.contains("kt") || lower.contains("knot") {
        Some(upper * 1.852)
    } else {
        Some(upper * MPH_TO_KPH)
    }
}

/// When a point lookup received at `now` stops being reusable. Lifetimes too
/// large to represent saturate at the latest representable instant.
fn point_expires_at(now: DateTime<Utc>, headers: &HeaderMap) -> DateTime<Utc> {
    let ttl = match max_age_seconds(headers) {
        Some(secs) => ChronoDuration::try_seconds(secs),
        None => Some(ChronoDuration::hours(DEFAULT_POINT_TTL_HOURS)),
    };
    ttl.and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

fn max_age_seconds(headers: &HeaderMap) -> Option<i64> {
    headers
        .get(CACHE_CONTROL)?
        .to_str()
        .ok()?
        .split(',')
        .filter_map(|directive| directive.trim().strip_prefix("max-age="))
        .find_map(|secs| secs.parse().ok())
}
