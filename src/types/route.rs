//! Route geometry as returned by a route provider, and the samples drawn from it.

use crate::route::error::RouteProviderError;
use crate::types::coordinate::Coordinate;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// An ordered polyline with the cumulative travel time to reach each vertex.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    polyline: Vec<Coordinate>,
    cumulative_seconds: Vec<f64>,
}

impl Route {
    /// Validates and builds a route.
    ///
    /// The polyline must be non-empty and the same length as
    /// `cumulative_seconds`, which must start at a finite, non-negative value
    /// and never decrease.
    pub fn new(
        polyline: Vec<Coordinate>,
        cumulative_seconds: Vec<f64>,
    ) -> Result<Self, RouteProviderError> {
        if polyline.is_empty() {
            return Err(RouteProviderError::Malformed(
                "route polyline is empty".to_string(),
            ));
        }
        if polyline.len() != cumulative_seconds.len() {
            return Err(RouteProviderError::Malformed(format!(
                "polyline has {} points but {} cumulative times",
                polyline.len(),
                cumulative_seconds.len()
            )));
        }
        let mut previous = 0.0;
        for (i, &secs) in cumulative_seconds.iter().enumerate() {
            if !secs.is_finite() || secs < previous {
                return Err(RouteProviderError::Malformed(format!(
                    "cumulative time at point {i} ({secs}) is not monotonic"
                )));
            }
            previous = secs;
        }
        Ok(Self {
            polyline,
            cumulative_seconds,
        })
    }

    /// Builds a route by concatenating provider steps.
    ///
    /// Each step's duration is spread over its vertices in proportion to the
    /// haversine length of each segment. A step whose first vertex repeats the
    /// previous step's last vertex does not duplicate that vertex.
    pub fn from_steps(steps: &[RouteStep]) -> Result<Self, RouteProviderError> {
        let mut polyline: Vec<Coordinate> = Vec::new();
        let mut cumulative: Vec<f64> = Vec::new();
        let mut elapsed = 0.0;

        for step in steps {
            let Some(&first) = step.polyline.first() else {
                continue;
            };
            let step_secs = step.duration.as_secs_f64();
            let segments: Vec<f64> = step
                .polyline
                .windows(2)
                .map(|w| w[0].distance_km(&w[1]))
                .collect();
            let total_km: f64 = segments.iter().sum();

            if polyline.last() != Some(&first) {
                polyline.push(first);
                cumulative.push(elapsed);
            }
            let mut step_time = elapsed;
            for (i, point) in step.polyline.iter().enumerate().skip(1) {
                let share = if total_km > 0.0 {
                    segments[i - 1] / total_km
                } else {
                    1.0 / segments.len() as f64
                };
                step_time += step_secs * share;
                polyline.push(*point);
                cumulative.push(step_time);
            }
            elapsed += step_secs;
            // Float drift must not leave the last vertex short of the step end.
            if let Some(last) = cumulative.last_mut() {
                *last = elapsed;
            }
        }

        Self::new(polyline, cumulative)
    }

    pub fn polyline(&self) -> &[Coordinate] {
        &self.polyline
    }

    pub fn cumulative_seconds(&self) -> &[f64] {
        &self.cumulative_seconds
    }

    pub fn len(&self) -> usize {
        self.polyline.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polyline.is_empty()
    }
}

/// One leg step from a route provider: its vertices and how long it takes.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteStep {
    pub polyline: Vec<Coordinate>,
    pub duration: Duration,
}

/// Maximum spacing between consecutive route samples.
///
/// Whichever limit is reached first forces a new sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpacingPolicy {
    pub max_distance_km: f64,
    pub max_time_delta: Duration,
}

impl Default for SpacingPolicy {
    fn default() -> Self {
        Self {
            max_distance_km: 10.0,
            max_time_delta: Duration::from_secs(15 * 60),
        }
    }
}

/// A point along a route at which weather is looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteSample {
    pub index: usize,
    pub coordinate: Coordinate,
    pub arrival: DateTime<Utc>,
}
