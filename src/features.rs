use std::collections::HashMap;

use crate::models::{AudioFeatures, Feature, Track};

/// Column width for wrapped track names on charts.
pub const NAME_WRAP_WIDTH: usize = 30;

/// One track's metadata joined with its audio features.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub id: String,
    pub name: String,
    pub track_number: u32,
    pub album: String,
    /// `name` wrapped to [`NAME_WRAP_WIDTH`] columns.
    pub display_name: String,
    pub features: AudioFeatures,
}

impl FeatureRow {
    pub fn get(&self, feature: Feature) -> Option<f64> {
        feature.get(&self.features)
    }

    /// Case-insensitive prefix match on the track name.
    pub fn name_starts_with(&self, prefix: &str) -> bool {
        self.name.to_lowercase().starts_with(&prefix.to_lowercase())
    }
}

/// Inner-join tracks to feature records by track id and tag each row with
/// `album_label`. Row order follows `tracks`.
///
/// Tracks without a feature record are dropped; a delisted or relinked track
/// therefore disappears from the charts rather than failing the run.
pub fn aggregate(tracks: &[Track], features: &[AudioFeatures], album_label: &str) -> Vec<FeatureRow> {
    let mut by_id: HashMap<&str, Vec<&AudioFeatures>> = HashMap::new();
    for f in features {
        by_id.entry(f.id.as_str()).or_default().push(f);
    }

    let mut rows = Vec::with_capacity(tracks.len());
    for track in tracks {
        match by_id.get(track.id.as_str()) {
            Some(matches) => {
                for f in matches {
                    rows.push(FeatureRow {
                        id: track.id.clone(),
                        name: track.name.clone(),
                        track_number: track.track_number,
                        album: album_label.to_string(),
                        display_name: wrap_text(&track.name, NAME_WRAP_WIDTH),
                        features: (*f).clone(),
                    });
                }
            }
            None => {
                log::debug!("No audio features for {} ({}), dropping", track.name, track.id);
            }
        }
    }
    rows
}

/// Greedy word wrap joined with newlines. Lines may also break after a
/// hyphen inside a word (`Ex-Girlfriend` can end a line at `Ex-`). Words
/// longer than `width` are split.
pub fn wrap_text(text: &str, width: usize) -> String {
    let width = width.max(1);
    let mut lines: Vec<String> = Vec::new();
    let mut current: Vec<char> = Vec::new();

    for word in text.split_whitespace() {
        for (i, piece) in hyphen_pieces(word).into_iter().enumerate() {
            // Only the first piece of a word is preceded by a space
            place_piece(&mut lines, &mut current, piece, i == 0, width);
        }
    }
    if !current.is_empty() {
        lines.push(current.into_iter().collect());
    }
    lines.join("\n")
}

fn place_piece(lines: &mut Vec<String>, current: &mut Vec<char>, mut piece: Vec<char>, spaced: bool, width: usize) {
    loop {
        let gap = usize::from(spaced && !current.is_empty());
        if current.len() + gap + piece.len() <= width {
            if gap == 1 {
                current.push(' ');
            }
            current.append(&mut piece);
            return;
        }
        if piece.len() > width {
            // Fill the rest of this line with the head of the long piece
            let room = width.saturating_sub(current.len() + gap);
            if room == 0 {
                lines.push(current.drain(..).collect());
                continue;
            }
            if gap == 1 {
                current.push(' ');
            }
            let rest = piece.split_off(room);
            current.append(&mut piece);
            lines.push(current.drain(..).collect());
            piece = rest;
            if piece.is_empty() {
                return;
            }
            continue;
        }
        lines.push(current.drain(..).collect());
    }
}

/// Split a word after each hyphen that sits between two alphanumerics.
fn hyphen_pieces(word: &str) -> Vec<Vec<char>> {
    let chars: Vec<char> = word.chars().collect();
    let mut pieces = Vec::new();
    let mut start = 0;
    for i in 1..chars.len().saturating_sub(1) {
        if chars[i] == '-' && chars[i - 1].is_alphanumeric() && chars[i + 1].is_alphanumeric() {
            pieces.push(chars[start..=i].to_vec());
            start = i + 1;
        }
    }
    pieces.push(chars[start..].to_vec());
    pieces
}

/// Rows worth labelling on the energy/danceability scatter: the first row
/// holding the max and min of each axis, then every row whose name starts
/// with `highlight_prefix` (case-insensitive). Indices are unique, in that
/// order.
pub fn label_rows(rows: &[FeatureRow], highlight_prefix: Option<&str>) -> Vec<usize> {
    let mut picked = Vec::new();
    for feature in [Feature::Energy, Feature::Danceability] {
        for want_max in [true, false] {
            if let Some(i) = extreme_index(rows, feature, want_max) {
                if !picked.contains(&i) {
                    picked.push(i);
                }
            }
        }
    }

    if let Some(prefix) = highlight_prefix {
        for (i, row) in rows.iter().enumerate() {
            if row.name_starts_with(prefix) && !picked.contains(&i) {
                picked.push(i);
            }
        }
    }
    picked
}

fn extreme_index(rows: &[FeatureRow], feature: Feature, want_max: bool) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, row) in rows.iter().enumerate() {
        let Some(v) = row.get(feature) else { continue };
        let better = match best {
            None => true,
            Some((_, b)) => {
                if want_max { v > b } else { v < b }
            }
        };
        if better {
            best = Some((i, v));
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(id: &str, name: &str, n: u32) -> Track {
        Track {
            id: id.to_string(),
            name: name.to_string(),
            track_number: n,
            duration_ms: None,
        }
    }

    fn feat(id: &str, danceability: f64, energy: f64) -> AudioFeatures {
        AudioFeatures {
            id: id.to_string(),
            danceability: Some(danceability),
            energy: Some(energy),
            ..AudioFeatures::default()
        }
    }

    #[test]
    fn test_unmatched_track_dropped() {
        let tracks = [track("a", "A", 1), track("b", "B", 2)];
        let features = [AudioFeatures {
            id: "a".into(),
            danceability: Some(0.7),
            ..AudioFeatures::default()
        }];
        let rows = aggregate(&tracks, &features, "Animals");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "a");
        assert_eq!(rows[0].album, "Animals");
        assert_eq!(rows[0].get(Feature::Danceability), Some(0.7));
    }

    #[test]
    fn test_rows_follow_track_order() {
        let tracks = [track("x", "X", 1), track("y", "Y", 2), track("z", "Z", 3)];
        let features = [feat("z", 0.1, 0.2), feat("x", 0.3, 0.4), feat("y", 0.5, 0.6)];
        let rows = aggregate(&tracks, &features, "LP");
        let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["x", "y", "z"]);
        assert_eq!(rows[2].track_number, 3);
    }

    #[test]
    fn test_display_name_wrapped() {
        let name = "If I Were a Hedgehog I Would Be the Best Hedgehog";
        let rows = aggregate(&[track("a", name, 1)], &[feat("a", 0.5, 0.5)], "LP");
        assert!(rows[0].display_name.lines().all(|l| l.chars().count() <= NAME_WRAP_WIDTH));
        assert_eq!(rows[0].display_name.replace('\n', " "), name);
    }

    #[test]
    fn test_wrap_text() {
        assert_eq!(wrap_text("26 is Dancier Than 4", 30), "26 is Dancier Than 4");
        assert_eq!(wrap_text("one two three", 7), "one two\nthree");
        assert_eq!(wrap_text("abcdefghij", 4), "abcd\nefgh\nij");
        assert_eq!(wrap_text("ab cdefghij", 4), "ab c\ndefg\nhij");
        assert_eq!(wrap_text("  spaced   out ", 20), "spaced out");
        assert_eq!(wrap_text("", 10), "");
    }

    #[test]
    fn test_wrap_text_breaks_after_hyphens() {
        assert_eq!(wrap_text("Ex-Girlfriend-Tribute Bandwagon", 15), "Ex-Girlfriend-\nTribute\nBandwagon");
        assert_eq!(wrap_text("a well-known song", 8), "a well-\nknown\nsong");
        // Hyphens that fit stay joined; dashes between spaces are words
        assert_eq!(wrap_text("a well-known song", 30), "a well-known song");
        assert_eq!(wrap_text("Pig - live", 4), "Pig\n-\nlive");
        assert_eq!(wrap_text("--x", 2), "--\nx");
    }

    #[test]
    fn test_label_rows() {
        let tracks = [
            track("a", "Chinese Zodiac", 1),
            track("b", "26 is Dancier Than 4", 2),
            track("c", "Pig", 3),
        ];
        let features = [feat("a", 0.2, 0.9), feat("b", 0.6, 0.5), feat("c", 0.9, 0.1)];
        let rows = aggregate(&tracks, &features, "LP");

        // energy max=a, min=c; danceability max=c, min=a; then the highlight
        assert_eq!(label_rows(&rows, Some("26 IS ")), vec![0, 2, 1]);
        assert_eq!(label_rows(&rows, None), vec![0, 2]);
        assert!(label_rows(&[], Some("x")).is_empty());
    }
}
