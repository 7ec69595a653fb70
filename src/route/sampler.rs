//! Route Sampler: picks the points along a route at which weather is looked up.

use crate::types::coordinate::Coordinate;
use crate::types::route::{Route, RouteSample, SpacingPolicy};
use chrono::{DateTime, Duration as ChronoDuration, Utc};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteSampler {
    policy: SpacingPolicy,
}

/// A point on the route, either a vertex or an interpolated point on a segment.
#[derive(Debug, Clone, Copy)]
struct PathPoint {
    coordinate: Coordinate,
    /// Milliseconds since departure.
    offset_ms: i64,
    /// Haversine length of the piece leading to this point.
    piece_km: f64,
}

impl RouteSampler {
    pub fn new(policy: SpacingPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &SpacingPolicy {
        &self.policy
    }

    /// Samples `route` for a trip leaving at `departure`.
    ///
    /// The first and last vertices are always sampled. Between consecutive
    /// samples, neither the path distance nor the travel time exceeds the
    /// policy's limits: a new sample is placed at the last point that still
    /// fits, and segments longer than a limit are subdivided by linear
    /// interpolation of position and time. The result is deterministic for a
    /// given route and policy, and a single-point route yields exactly one
    /// sample.
    pub fn sample(&self, route: &Route, departure: DateTime<Utc>) -> Vec<RouteSample> {
        let max_km = self.policy.max_distance_km;
        let max_ms = max_time_ms(&self.policy);
        let points = self.densify(route, max_ms);

        let mut picked = vec![0];
        let mut last = 0;
        let mut distance_since = 0.0;
        for j in 1..points.len() {
            let point = &points[j];
            let overshoots = distance_since + point.piece_km > max_km
                || point.offset_ms - points[last].offset_ms > max_ms;
            if overshoots && j - 1 != last {
                last = j - 1;
                picked.push(last);
                distance_since = 0.0;
            }
            distance_since += point.piece_km;
            if j == points.len() - 1 {
                picked.push(j);
            }
        }

        picked
            .into_iter()
            .enumerate()
            .map(|(index, p)| RouteSample {
                index,
                coordinate: points[p].coordinate,
                arrival: departure + ChronoDuration::milliseconds(points[p].offset_ms),
            })
            .collect()
    }

    /// Splits every segment into equal pieces, each within both limits.
    fn densify(&self, route: &Route, max_ms: i64) -> Vec<PathPoint> {
        let polyline = route.polyline();
        let offsets: Vec<i64> = route
            .cumulative_seconds()
            .iter()
            .map(|secs| (secs * 1000.0).round() as i64)
            .collect();

        let mut points = vec![PathPoint {
            coordinate: polyline[0],
            offset_ms: offsets[0],
            piece_km: 0.0,
        }];
        for i in 1..polyline.len() {
            let (from, to) = (polyline[i - 1], polyline[i]);
            let (start_ms, span_ms) = (offsets[i - 1], offsets[i] - offsets[i - 1]);
            let by_distance = (from.distance_km(&to) / self.policy.max_distance_km).ceil();
            let by_time = span_ms.div_euclid(max_ms) + i64::from(span_ms.rem_euclid(max_ms) != 0);
            let mut pieces = (by_distance as i64).max(by_time).max(1);

            // Interpolating in degrees does not follow the great circle exactly,
            // so the first guess can leave a piece slightly over the limit.
            let segment = loop {
                let segment = split_segment(from, to, start_ms, span_ms, pieces);
                let mut previous = from;
                let fits = segment.iter().all(|p| {
                    let km = previous.distance_km(&p.coordinate);
                    previous = p.coordinate;
                    km <= self.policy.max_distance_km
                });
                if fits {
                    break segment;
                }
                pieces += 1;
            };
            points.extend(segment);
        }
        points
    }
}

fn max_time_ms(policy: &SpacingPolicy) -> i64 {
    i64::try_from(policy.max_time_delta.as_millis())
        .unwrap_or(i64::MAX)
        .max(1)
}

/// The `pieces` end points of a segment split evenly, the last one being `to`.
fn split_segment(
    from: Coordinate,
    to: Coordinate,
    start_ms: i64,
    span_ms: i64,
    pieces: i64,
) -> Vec<PathPoint> {
    let mut previous = from;
    (1..=pieces)
        .map(|k| {
            let coordinate = if k == pieces {
                to
            } else {
                from.lerp(&to, k as f64 / pieces as f64)
            };
            let offset_ms =
                start_ms + (i128::from(span_ms) * i128::from(k) / i128::from(pieces)) as i64;
            let piece_km = previous.distance_km(&coordinate);
            previous = coordinate;
            PathPoint {
                coordinate,
                offset_ms,
                piece_km,
            }
        })
        .collect()
}
