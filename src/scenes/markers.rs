//! Scenes built from user-placed thumbs.
//!
//! Each thumb owns the frames up to the midpoint between it and the next thumb.
//! The boundary is `floor((next - this) / 2) + 1` frames past the thumb, so an
//! odd gap puts the middle frame in the earlier scene.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Scene, SceneColor};

/// Color given to scenes built from thumbs.
pub const MARKER_SCENE_COLOR: SceneColor = [40, 40, 40];

/// A thumb placed on a frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Marker {
    pub thumb_id: String,
    pub frame_number: u32,
}

/// Split `[0, frame_count)` into one scene per marker.
///
/// Markers may come in any order; markers on an already used frame are skipped,
/// and so are markers at or past `frame_count`.
pub fn scenes_from_markers(file_id: &str, markers: &[Marker], frame_count: u32) -> Vec<Scene> {
    let mut sorted: Vec<&Marker> = markers
        .iter()
        .filter(|m| m.frame_number < frame_count)
        .collect();
    if sorted.len() < markers.len() {
        debug!(
            file_id,
            dropped = markers.len() - sorted.len(),
            frame_count,
            "Ignoring markers past the last frame"
        );
    }
    sorted.sort_by_key(|m| m.frame_number);
    sorted.dedup_by_key(|m| m.frame_number);

    let mut scenes = Vec::with_capacity(sorted.len());
    let mut start = 0u32;

    for (index, marker) in sorted.iter().enumerate() {
        let end = match sorted.get(index + 1) {
            Some(next) => marker.frame_number + (next.frame_number - marker.frame_number) / 2 + 1,
            None => frame_count,
        };
        scenes.push(Scene {
            scene_id: marker.thumb_id.clone(),
            file_id: file_id.to_string(),
            start,
            length: end - start,
            color_array: MARKER_SCENE_COLOR,
        });
        start = end;
    }

    scenes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenes::is_partition;

    fn markers(frames: &[u32]) -> Vec<Marker> {
        frames
            .iter()
            .map(|&f| Marker {
                thumb_id: format!("thumb-{}", f),
                frame_number: f,
            })
            .collect()
    }

    fn bounds(scenes: &[Scene]) -> Vec<(u32, u32)> {
        scenes.iter().map(|s| (s.start, s.length)).collect()
    }

    #[test]
    fn test_midpoint_boundaries() {
        let scenes = scenes_from_markers("f", &markers(&[0, 10, 20, 30]), 40);

        // 0 + 5 + 1 = 6, 10 + 5 + 1 = 16, 20 + 5 + 1 = 26
        assert_eq!(bounds(&scenes), vec![(0, 6), (6, 10), (16, 10), (26, 14)]);
        assert!(is_partition(&scenes, 40));
    }

    #[test]
    fn test_odd_gap_rounds_down() {
        let scenes = scenes_from_markers("f", &markers(&[5, 12]), 20);

        // 5 + floor(7 / 2) + 1 = 9
        assert_eq!(bounds(&scenes), vec![(0, 9), (9, 11)]);
    }

    #[test]
    fn test_unsorted_and_duplicate_markers() {
        let mut input = markers(&[30, 0, 10]);
        input.push(Marker {
            thumb_id: "again".to_string(),
            frame_number: 10,
        });
        let scenes = scenes_from_markers("f", &input, 31);

        assert_eq!(scenes.len(), 3);
        assert_eq!(scenes[1].scene_id, "thumb-10");
        assert!(is_partition(&scenes, 31));
    }

    #[test]
    fn test_single_marker_covers_everything() {
        let scenes = scenes_from_markers("f", &markers(&[12]), 100);

        assert_eq!(bounds(&scenes), vec![(0, 100)]);
        assert_eq!(scenes[0].color_array, MARKER_SCENE_COLOR);
    }

    #[test]
    fn test_adjacent_markers_keep_nonempty_scenes() {
        let scenes = scenes_from_markers("f", &markers(&[0, 1, 2, 3]), 4);

        assert_eq!(bounds(&scenes), vec![(0, 1), (1, 1), (2, 1), (3, 1)]);
    }

    #[test]
    fn test_markers_past_frame_count_are_ignored() {
        let scenes = scenes_from_markers("f", &markers(&[0, 50, 40]), 40);

        assert_eq!(bounds(&scenes), vec![(0, 40)]);
        assert!(is_partition(&scenes, 40));

        let scenes = scenes_from_markers("f", &markers(&[0, 20, 39]), 40);
        assert_eq!(bounds(&scenes), vec![(0, 11), (11, 19), (30, 10)]);
        assert!(is_partition(&scenes, 40));

        assert!(scenes_from_markers("f", &markers(&[3]), 0).is_empty());
    }

    #[test]
    fn test_no_markers() {
        assert!(scenes_from_markers("f", &[], 10).is_empty());
    }
}
