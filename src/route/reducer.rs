//! Reductions over per-sample route forecasts.
//!
//! A reduction only ever sees successful samples as evidence; failed samples
//! are reflected in the summary's completeness ratio instead.

use crate::types::summary::{RouteFlags, SampleForecast, TemperatureRange};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub trait RouteReducer: Send + Sync {
    type Output;

    fn reduce(&self, samples: &[SampleForecast]) -> Self::Output;
}

/// Computes [`RouteFlags`]: precipitation risk, wind maxima and temperature range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdReducer {
    /// Precipitation probability, in percent, that must be exceeded for a
    /// sample to count as a precipitation risk.
    pub precipitation_threshold_pct: f64,
}

impl RouteReducer for ThresholdReducer {
    type Output = RouteFlags;

    fn reduce(&self, samples: &[SampleForecast]) -> RouteFlags {
        let forecasts: Vec<_> = samples.iter().filter_map(|s| s.forecast()).collect();

        let precipitation_risk = forecasts
            .iter()
            .any(|p| p.precipitation_probability_pct > self.precipitation_threshold_pct);
        let max_wind_kph = forecasts
            .iter()
            .map(|p| OrderedFloat(p.wind.speed_kph))
            .max()
            .map(OrderedFloat::into_inner);
        let max_gust_kph = forecasts
            .iter()
            .filter_map(|p| p.wind.gust_kph.map(OrderedFloat))
            .max()
            .map(OrderedFloat::into_inner);
        let temps = forecasts.iter().map(|p| OrderedFloat(p.temperature_c));
        let temperature_range = temps
            .clone()
            .min()
            .zip(temps.max())
            .map(|(min, max)| TemperatureRange {
                min_c: min.into_inner(),
                max_c: max.into_inner(),
            });

        RouteFlags {
            precipitation_risk,
            max_wind_kph,
            max_gust_kph,
            temperature_range,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Gear {
    RainGear,
    BreathableGear,
    WinterGear,
    AllWeatherGear,
}

/// Suggests riding gear from each successful sample's conditions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GearSuggester {
    /// At or below this temperature winter gear is suggested.
    pub cold_below_c: f64,
    /// Above this precipitation probability rain gear is suggested.
    pub rain_above_pct: f64,
}

impl Default for GearSuggester {
    fn default() -> Self {
        Self {
            cold_below_c: 7.0,
            rain_above_pct: 50.0,
        }
    }
}

impl GearSuggester {
    fn gear_for(&self, sample: &SampleForecast) -> Option<Gear> {
        let period = sample.forecast()?;
        let summary = period.summary.to_ascii_lowercase();
        let wet = ["rain", "shower", "drizzle", "storm", "snow", "sleet"]
            .iter()
            .any(|w| summary.contains(w));

        Some(if wet || period.precipitation_probability_pct > self.rain_above_pct {
            Gear::RainGear
        } else if period.temperature_c <= self.cold_below_c || summary.contains("cold") {
            Gear::WinterGear
        } else if summary.contains("sunny") || summary.contains("clear") || summary.contains("partly cloudy") {
            Gear::BreathableGear
        } else {
            Gear::AllWeatherGear
        })
    }
}

impl RouteReducer for GearSuggester {
    type Output = BTreeSet<Gear>;

    fn reduce(&self, samples: &[SampleForecast]) -> BTreeSet<Gear> {
        samples.iter().filter_map(|s| self.gear_for(s)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::error::{ForecastUnavailable, UnavailableReason};
    use crate::testing::period;
    use crate::types::coordinate::Coordinate;
    use crate::types::route::RouteSample;
    use chrono::{TimeZone, Utc};

    fn sample(index: usize, outcome: Option<(f64, f64, f64, &str)>) -> SampleForecast {
        let t = Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap();
        let coordinate = Coordinate::new(0.0, index as f64).unwrap();
        SampleForecast {
            sample: RouteSample {
                index,
                coordinate,
                arrival: t,
            },
            outcome: match outcome {
                Some((temp, precip, wind, text)) => Ok(period(t, 1, temp, precip, wind, text)),
                None => Err(ForecastUnavailable::new(
                    coordinate,
                    UnavailableReason::RouteDeadline,
                )),
            },
        }
    }

    #[test]
    fn test_threshold_flags_ignore_failures() {
        let samples = vec![
            sample(0, Some((12.0, 20.0, 10.0, "Sunny"))),
            sample(1, None),
            sample(2, Some((4.0, 50.0, 25.0, "Cloudy"))),
        ];
        let flags = ThresholdReducer {
            precipitation_threshold_pct: 50.0,
        }
        .reduce(&samples);

        // 50% is not above a 50% threshold.
        assert!(!flags.precipitation_risk);
        assert_eq!(flags.max_wind_kph, Some(25.0));
        assert_eq!(flags.max_gust_kph, None);
        assert_eq!(
            flags.temperature_range,
            Some(TemperatureRange {
                min_c: 4.0,
                max_c: 12.0
            })
        );

        let flags = ThresholdReducer {
            precipitation_threshold_pct: 40.0,
        }
        .reduce(&samples);
        assert!(flags.precipitation_risk);
    }

    #[test]
    fn test_threshold_flags_with_no_successes() {
        let flags = ThresholdReducer {
            precipitation_threshold_pct: 50.0,
        }
        .reduce(&[sample(0, None)]);
        assert_eq!(flags, RouteFlags::default());
    }

    #[test]
    fn test_gear_suggestions() {
        let samples = vec![
            sample(0, Some((20.0, 10.0, 5.0, "Mostly Sunny"))),
            sample(1, Some((18.0, 30.0, 5.0, "Chance Rain Showers"))),
            sample(2, Some((2.0, 0.0, 5.0, "Cloudy"))),
            sample(3, None),
        ];
        let gear = GearSuggester::default().reduce(&samples);
        assert_eq!(
            gear.into_iter().collect::<Vec<_>>(),
            vec![Gear::RainGear, Gear::BreathableGear, Gear::WinterGear]
        );

        let overcast = GearSuggester::default().reduce(&[sample(0, Some((15.0, 0.0, 5.0, "Cloudy")))]);
        assert!(overcast.contains(&Gear::AllWeatherGear));
    }
}
