use std::collections::BTreeMap;

use super::Breakpoint;
use super::spline::{QuadraticSpline, SplineError};

/// Grid arithmetic is done in integer nanoseconds so window edges and grid
/// points land exactly on multiples of the interval.
const TICKS_PER_SEC: f64 = 1e9;

pub(crate) fn to_ticks(secs: f64) -> i64 {
    (secs * TICKS_PER_SEC).round() as i64
}

fn to_secs(ticks: i64) -> f64 {
    ticks as f64 / TICKS_PER_SEC
}

/// Bucket points into left-closed windows `[k·interval, (k+1)·interval)`
/// anchored at time 0 and keep the quietest (minimum) loudness of each.
///
/// Each output point sits at its window's left edge. Empty windows produce
/// no point. Output is sorted by time.
pub fn downsample_min(points: &[Breakpoint], interval: f64) -> Vec<Breakpoint> {
    let width = to_ticks(interval);
    if width <= 0 {
        return Vec::new();
    }

    let mut windows: BTreeMap<i64, f64> = BTreeMap::new();
    for p in points {
        if p.loudness.is_nan() {
            continue;
        }
        let k = to_ticks(p.time).div_euclid(width);
        windows
            .entry(k)
            .and_modify(|m| *m = m.min(p.loudness))
            .or_insert(p.loudness);
    }

    windows
        .into_iter()
        .map(|(k, loudness)| Breakpoint {
            time: to_secs(k * width),
            loudness,
        })
        .collect()
}

/// Resample sorted points onto a regular `step` grid from the first to the
/// last point, filling between them with a quadratic interpolating spline.
/// Grid times that coincide with an input point keep its exact value.
pub fn resample_quadratic(points: &[Breakpoint], step: f64) -> Result<Vec<Breakpoint>, SplineError> {
    let xs: Vec<f64> = points.iter().map(|p| p.time).collect();
    let ys: Vec<f64> = points.iter().map(|p| p.loudness).collect();
    let spline = QuadraticSpline::fit(&xs, &ys)?;

    let step_ticks = to_ticks(step);
    if step_ticks <= 0 {
        return Err(SplineError::NotIncreasing);
    }
    let first = to_ticks(xs[0]);
    let last = to_ticks(xs[xs.len() - 1]);

    let count = ((last - first) / step_ticks + 1) as usize;
    let mut out = Vec::with_capacity(count);
    let mut known = points.iter().map(|p| (to_ticks(p.time), p.loudness)).peekable();

    let mut tick = first;
    while tick <= last {
        // Skip input points the grid stepped past
        while known.peek().is_some_and(|&(t, _)| t < tick) {
            known.next();
        }
        let loudness = match known.peek() {
            Some(&(t, v)) if t == tick => v,
            _ => spline.eval(to_secs(tick)),
        };
        out.push(Breakpoint {
            time: to_secs(tick),
            loudness,
        });
        tick += step_ticks;
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bp(time: f64, loudness: f64) -> Breakpoint {
        Breakpoint { time, loudness }
    }

    #[test]
    fn test_single_point_window_unchanged() {
        let out = downsample_min(&[bp(0.7, -13.25)], 0.5);
        assert_eq!(out, vec![bp(0.5, -13.25)]);
    }

    #[test]
    fn test_window_takes_minimum() {
        let pts = [bp(0.0, -20.0), bp(0.5, -5.0), bp(1.0, -10.0), bp(1.0, -10.0), bp(1.3, -2.0)];
        let out = downsample_min(&pts, 0.5);
        assert_eq!(out, vec![bp(0.0, -20.0), bp(0.5, -5.0), bp(1.0, -10.0)]);
    }

    #[test]
    fn test_windows_are_left_closed() {
        // 0.5 belongs to [0.5, 1.0), not [0.0, 0.5)
        let out = downsample_min(&[bp(0.49, -1.0), bp(0.5, -30.0)], 0.5);
        assert_eq!(out, vec![bp(0.0, -1.0), bp(0.5, -30.0)]);
    }

    #[test]
    fn test_empty_windows_leave_gaps() {
        let out = downsample_min(&[bp(0.1, -3.0), bp(2.2, -4.0)], 0.5);
        assert_eq!(out, vec![bp(0.0, -3.0), bp(2.0, -4.0)]);
    }

    #[test]
    fn test_decimal_interval_edges_exact() {
        // 0.3 / 0.1 is 2.9999999999999996 in floating point
        let out = downsample_min(&[bp(0.3, -8.0)], 0.1);
        assert_eq!(out.len(), 1);
        assert!((out[0].time - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_resample_grid_and_known_points() {
        let coarse = [bp(0.0, -20.0), bp(0.5, -5.0), bp(1.0, -10.0)];
        let fine = resample_quadratic(&coarse, 0.05).unwrap();
        assert_eq!(fine.len(), 21);
        assert_eq!(fine[0], bp(0.0, -20.0));
        assert_eq!(fine[10].loudness, -5.0);
        assert_eq!(fine[20].loudness, -10.0);
        assert!((fine[5].loudness - -10.0).abs() < 1e-9);
        for w in fine.windows(2) {
            assert!(w[0].time < w[1].time);
        }
    }

    #[test]
    fn test_resample_fills_gaps() {
        let coarse = [bp(0.0, -20.0), bp(0.5, -10.0), bp(2.0, -10.0), bp(2.5, -20.0)];
        let fine = resample_quadratic(&coarse, 0.5).unwrap();
        assert_eq!(fine.len(), 6);
        assert_eq!(fine[3].time, 1.5);
        assert!(fine[2].loudness.is_finite() && fine[3].loudness.is_finite());
    }

    #[test]
    fn test_resample_needs_three_points() {
        let err = resample_quadratic(&[bp(0.0, -1.0), bp(0.5, -2.0)], 0.05).unwrap_err();
        assert_eq!(err, SplineError::TooFewPoints(2));
    }
}
