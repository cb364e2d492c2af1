pub mod resample;
pub mod spline;

use thiserror::Error;

use crate::models::Segment;
use resample::{downsample_min, resample_quadratic, to_ticks};
use spline::SplineError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WaveformError {
    #[error("Track {track_number} ({track_name}) has no segments")]
    NoSegments { track_name: String, track_number: u32 },
    #[error("Invalid resample intervals: coarse {coarse}s, fine {fine}s")]
    InvalidInterval { coarse: f64, fine: f64 },
    #[error(
        "Track {track_number} ({track_name}) has {found} coarse points; \
         quadratic interpolation needs at least 3"
    )]
    TooFewPoints {
        track_name: String,
        track_number: u32,
        found: usize,
    },
    #[error("Track {track_number} ({track_name}): {source}")]
    Interpolation {
        track_name: String,
        track_number: u32,
        #[source]
        source: SplineError,
    },
}

/// A (time, loudness) sample taken from a segment at a notable instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Breakpoint {
    /// Seconds from the start of the track.
    pub time: f64,
    /// dB.
    pub loudness: f64,
}

/// One point of a resampled, normalized waveform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveformSample {
    /// Seconds from the start of the track.
    pub time: f64,
    /// `track_min - level_db`: 0 at the quietest moment, largest magnitude at
    /// the loudest.
    pub loudness: f64,
    /// `-loudness`, the mirror image for symmetric fills.
    pub inverted: f64,
    /// The resampled dB value this sample was derived from.
    pub level_db: f64,
}

/// Normalized waveform of one track.
#[derive(Debug, Clone)]
pub struct TrackWaveform {
    pub name: String,
    pub track_number: u32,
    pub samples: Vec<WaveformSample>,
}

/// A sample on the centred time axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CenteredSample {
    pub time: f64,
    pub loudness: f64,
    pub inverted: f64,
}

#[derive(Debug, Clone)]
pub struct CenteredTrack {
    pub name: String,
    pub track_number: u32,
    pub samples: Vec<CenteredSample>,
}

/// Turn one track's raw segments into a smooth, normalized, mirrored waveform.
///
/// Segments are expected in ascending start order; they are not re-sorted.
/// `coarse_interval` and `fine_interval` are in seconds and `coarse_interval`
/// must be a whole multiple of `fine_interval`.
pub fn extract_waveform(
    segments: &[Segment],
    track_name: &str,
    track_number: u32,
    coarse_interval: f64,
    fine_interval: f64,
) -> Result<TrackWaveform, WaveformError> {
    check_intervals(coarse_interval, fine_interval)?;

    if segments.is_empty() {
        return Err(WaveformError::NoSegments {
            track_name: track_name.to_string(),
            track_number,
        });
    }

    let points = breakpoints(segments);
    let coarse = downsample_min(&points, coarse_interval);
    if coarse.len() < 3 {
        return Err(WaveformError::TooFewPoints {
            track_name: track_name.to_string(),
            track_number,
            found: coarse.len(),
        });
    }

    let fine = resample_quadratic(&coarse, fine_interval).map_err(|source| WaveformError::Interpolation {
        track_name: track_name.to_string(),
        track_number,
        source,
    })?;

    log::debug!(
        "Track {track_number} ({track_name}): {} segments -> {} breakpoints -> {} coarse -> {} samples",
        segments.len(),
        points.len(),
        coarse.len(),
        fine.len()
    );

    Ok(TrackWaveform {
        name: track_name.to_string(),
        track_number,
        samples: normalize(&fine),
    })
}

/// Derive breakpoints from segments: start, interior maximum, and the end
/// when `loudness_end` is set (0 is the "no end sample" sentinel, so a true
/// 0 dB end reading is dropped too).
pub fn breakpoints(segments: &[Segment]) -> Vec<Breakpoint> {
    let mut out = Vec::with_capacity(segments.len() * 3);
    for seg in segments {
        out.push(Breakpoint {
            time: seg.start,
            loudness: seg.loudness_start,
        });
        out.push(Breakpoint {
            time: seg.start + seg.loudness_max_time,
            loudness: seg.loudness_max,
        });
        if seg.loudness_end != 0.0 {
            out.push(Breakpoint {
                time: seg.start + seg.duration,
                loudness: seg.loudness_end,
            });
        }
    }
    out
}

/// Invert loudness against the series minimum so the quietest point maps to 0.
pub fn normalize(resampled: &[Breakpoint]) -> Vec<WaveformSample> {
    let track_min = resampled
        .iter()
        .map(|p| p.loudness)
        .fold(f64::INFINITY, f64::min);

    resampled
        .iter()
        .map(|p| {
            let loudness = track_min - p.loudness;
            WaveformSample {
                time: p.time,
                loudness,
                inverted: -loudness,
                level_db: p.loudness,
            }
        })
        .collect()
}

impl TrackWaveform {
    /// Latest sample time (0 for an empty waveform).
    pub fn max_time(&self) -> f64 {
        self.samples.iter().map(|s| s.time).fold(0.0, f64::max)
    }

    /// Shift the time axis so the track is horizontally centred on 0.
    pub fn centered(&self) -> CenteredTrack {
        let half = self.max_time() / 2.0;
        CenteredTrack {
            name: self.name.clone(),
            track_number: self.track_number,
            samples: self
                .samples
                .iter()
                .map(|s| CenteredSample {
                    time: s.time - half,
                    loudness: s.loudness,
                    inverted: s.inverted,
                })
                .collect(),
        }
    }
}

/// Centre every track of an album. Tracks keep the album's listing order,
/// which runs disc by disc; track numbers restart on each disc.
pub fn center_album(tracks: &[TrackWaveform]) -> Vec<CenteredTrack> {
    tracks.iter().map(TrackWaveform::centered).collect()
}

fn check_intervals(coarse: f64, fine: f64) -> Result<(), WaveformError> {
    let invalid = WaveformError::InvalidInterval { coarse, fine };
    if !(coarse.is_finite() && fine.is_finite()) || coarse <= 0.0 || fine <= 0.0 || fine > coarse {
        return Err(invalid);
    }
    let (c, f) = (to_ticks(coarse), to_ticks(fine));
    if f == 0 || c % f != 0 {
        return Err(invalid);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(start: f64, duration: f64, l_start: f64, l_max: f64, max_time: f64, l_end: f64) -> Segment {
        Segment {
            start,
            duration,
            loudness_start: l_start,
            loudness_max: l_max,
            loudness_max_time: max_time,
            loudness_end: l_end,
        }
    }

    fn example_segments() -> Vec<Segment> {
        vec![
            seg(0.0, 1.0, -20.0, -5.0, 0.5, -10.0),
            seg(1.0, 1.0, -10.0, -2.0, 0.3, 0.0),
        ]
    }

    /// Deterministic pseudo-random track: contiguous segments of varying length.
    fn synthetic_track(count: usize) -> Vec<Segment> {
        let mut segs = Vec::with_capacity(count);
        let mut start = 0.0;
        for i in 0..count {
            let duration = 0.15 + (i % 7) as f64 * 0.05;
            let l_start = -40.0 + (i % 11) as f64 * 2.5;
            let l_max = l_start + 5.0 + (i % 3) as f64;
            let l_end = if i == count - 1 { -45.0 } else { 0.0 };
            segs.push(seg(start, duration, l_start, l_max, duration * 0.4, l_end));
            start += duration;
        }
        segs
    }

    fn bp(time: f64, loudness: f64) -> Breakpoint {
        Breakpoint { time, loudness }
    }

    #[test]
    fn test_breakpoints_example() {
        let pts = breakpoints(&example_segments());
        assert_eq!(
            pts,
            vec![bp(0.0, -20.0), bp(0.5, -5.0), bp(1.0, -10.0), bp(1.0, -10.0), bp(1.3, -2.0)]
        );
    }

    #[test]
    fn test_zero_end_is_sentinel() {
        // Even a genuine 0 dB end reading is indistinguishable from "unset"
        let segs = [
            seg(0.0, 1.0, -3.0, -1.0, 0.2, 0.0),
            seg(1.0, 1.0, -3.0, -1.0, 0.2, -0.5),
            seg(2.0, 1.0, -3.0, 0.0, 0.2, 0.0),
        ];
        let pts = breakpoints(&segs);
        assert_eq!(pts.len(), 7);
        assert!(!pts.iter().any(|p| p.time == 1.0 && p.loudness == 0.0));
        assert!(!pts.iter().any(|p| p.time == 3.0));
        assert!(pts.contains(&bp(2.0, -0.5)));
    }

    #[test]
    fn test_breakpoint_times_non_decreasing() {
        let pts = breakpoints(&synthetic_track(500));
        for w in pts.windows(2) {
            assert!(w[0].time <= w[1].time, "{:?} then {:?}", w[0], w[1]);
        }
    }

    #[test]
    fn test_extract_example() {
        let w = extract_waveform(&example_segments(), "Pig", 2, 0.5, 0.05).unwrap();
        assert_eq!(w.name, "Pig");
        assert_eq!(w.track_number, 2);
        // Coarse points at 0, 0.5, 1.0 -> 21 fine samples
        assert_eq!(w.samples.len(), 21);

        // Spline through the three coarse points is y = -40x² + 50x - 20,
        // whose minimum on [0, 1] is -20 at x = 0.
        assert_eq!(w.samples[0].loudness, 0.0);
        assert_eq!(w.samples[10].level_db, -5.0);
        assert_eq!(w.samples[10].loudness, -15.0);
        assert!((w.samples[5].loudness - -10.0).abs() < 1e-9);
        for s in &w.samples {
            assert_eq!(s.inverted, -s.loudness);
            assert!(s.loudness <= 0.0);
        }
    }

    #[test]
    fn test_display_round_trip() {
        let w = extract_waveform(&synthetic_track(300), "t", 1, 0.5, 0.05).unwrap();
        let track_min = w.samples.iter().map(|s| s.level_db).fold(f64::INFINITY, f64::min);
        for s in &w.samples {
            let back = track_min - s.loudness;
            assert!(
                (back - s.level_db).abs() <= 1e-12 * s.level_db.abs().max(1.0),
                "{back} != {}",
                s.level_db
            );
        }
    }

    #[test]
    fn test_output_ascending_and_deterministic() {
        let segs = synthetic_track(400);
        let a = extract_waveform(&segs, "t", 1, 0.5, 0.05).unwrap();
        let b = extract_waveform(&segs, "t", 1, 0.5, 0.05).unwrap();
        assert_eq!(a.samples, b.samples);
        for w in a.samples.windows(2) {
            assert!(w[0].time < w[1].time);
        }
        assert!(a.samples.iter().all(|s| s.loudness.is_finite()));
    }

    #[test]
    fn test_centering_symmetric() {
        let w = extract_waveform(&synthetic_track(200), "t", 1, 0.5, 0.05).unwrap();
        assert_eq!(w.samples[0].time, 0.0);
        let c = w.centered();
        let lo = c.samples.iter().map(|s| s.time).fold(f64::INFINITY, f64::min);
        let hi = c.samples.iter().map(|s| s.time).fold(f64::NEG_INFINITY, f64::max);
        assert!(((lo + hi) / 2.0).abs() < 1e-12, "lo {lo} hi {hi}");
    }

    #[test]
    fn test_center_album_centres_each_track() {
        let long = extract_waveform(&synthetic_track(300), "long", 1, 0.5, 0.05).unwrap();
        let short = extract_waveform(&synthetic_track(60), "short", 2, 0.5, 0.05).unwrap();
        let album = center_album(&[long.clone(), short.clone()]);
        assert_eq!(album[0].name, "long");
        assert_eq!(album[1].name, "short");
        // Each track is centred on its own duration
        assert!((album[0].samples[0].time + long.max_time() / 2.0).abs() < 1e-12);
        assert!((album[1].samples[0].time + short.max_time() / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_center_album_keeps_disc_order() {
        // Two discs, numbering restarts at 1 on the second
        let listing = [("Disc 1 Opener", 1), ("Disc 1 Closer", 2), ("Disc 2 Opener", 1), ("Disc 2 Closer", 2)];
        let tracks: Vec<TrackWaveform> = listing
            .iter()
            .map(|(name, number)| extract_waveform(&synthetic_track(60), name, *number, 0.5, 0.05).unwrap())
            .collect();
        let album = center_album(&tracks);
        let names: Vec<&str> = album.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["Disc 1 Opener", "Disc 1 Closer", "Disc 2 Opener", "Disc 2 Closer"]);
    }

    #[test]
    fn test_empty_segments_is_error() {
        let err = extract_waveform(&[], "Silence", 4, 0.5, 0.05).unwrap_err();
        assert!(matches!(err, WaveformError::NoSegments { track_number: 4, .. }));
    }

    #[test]
    fn test_too_few_coarse_points() {
        let segs = [seg(0.0, 0.4, -20.0, -10.0, 0.2, 0.0), seg(0.4, 0.4, -18.0, -9.0, 0.1, -30.0)];
        let err = extract_waveform(&segs, "Short", 1, 0.5, 0.05).unwrap_err();
        assert!(matches!(err, WaveformError::TooFewPoints { found: 2, .. }));
    }

    #[test]
    fn test_invalid_intervals() {
        let segs = example_segments();
        for (coarse, fine) in [(0.5, 0.3), (0.5, 0.0), (0.05, 0.5), (-0.5, 0.05), (f64::NAN, 0.05)] {
            let err = extract_waveform(&segs, "t", 1, coarse, fine).unwrap_err();
            assert!(matches!(err, WaveformError::InvalidInterval { .. }), "{coarse}/{fine}");
        }
        assert!(extract_waveform(&segs, "t", 1, 0.5, 0.5).is_ok());
        // Decimal intervals are compared on the integer nanosecond grid
        assert!(check_intervals(0.3, 0.1).is_ok());
    }
}
