//! Scenes: contiguous runs of frames treated as one visual unit.
//!
//! Two builders produce the same [`Scene`] list: [`detection`] cuts on the
//! per-frame difference values, [`markers`] splits between user-placed thumbs.
//! Both return an ordered, gapless partition of the frame range.

pub mod detection;
pub mod markers;

use serde::{Deserialize, Serialize};

use crate::frames::MeanColor;

pub use detection::SceneDetector;
pub use markers::{scenes_from_markers, Marker};

/// Display color of a scene (r, g, b).
pub type SceneColor = [u8; 3];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    pub scene_id: String,
    pub file_id: String,
    pub start: u32,
    pub length: u32,
    pub color_array: SceneColor,
}

impl Scene {
    /// First frame after the scene.
    pub fn end(&self) -> u32 {
        self.start + self.length
    }

    pub fn contains(&self, frame_number: u32) -> bool {
        self.start <= frame_number && frame_number < self.end()
    }
}

/// Clamp a probed mean color into a displayable color.
pub fn to_scene_color(color: &MeanColor) -> SceneColor {
    color.map(|channel| channel.round().clamp(0.0, 255.0) as u8)
}

/// Check that `scenes` covers `[0, frame_count)` in order, without gaps or empty scenes.
pub fn is_partition(scenes: &[Scene], frame_count: u32) -> bool {
    let (Some(first), Some(last)) = (scenes.first(), scenes.last()) else {
        return frame_count == 0;
    };
    first.start == 0
        && scenes.iter().all(|s| s.length > 0)
        && scenes.windows(2).all(|w| w[0].end() == w[1].start)
        && last.end() == frame_count
}

/// Find the scene holding `frame_number`.
///
/// Frames outside the covered range resolve to the first or last scene.
pub fn scene_at_frame(scenes: &[Scene], frame_number: u32) -> Option<&Scene> {
    if let Some(scene) = scenes.iter().find(|s| s.contains(frame_number)) {
        return Some(scene);
    }

    let lowest = scenes.iter().map(|s| s.start).min()?;
    let highest = scenes.iter().map(|s| s.end()).max()?.saturating_sub(1);
    let clamped = frame_number.clamp(lowest, highest.max(lowest));
    scenes.iter().find(|s| s.contains(clamped))
}

/// Indices of the two scenes meeting at a cut, if `frame_number` starts a scene other than the first.
pub fn adjacent_scenes_at_cut(scenes: &[Scene], frame_number: u32) -> Option<(usize, usize)> {
    match scenes.iter().position(|s| s.start == frame_number) {
        Some(index) if index > 0 => Some((index - 1, index)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene(start: u32, length: u32) -> Scene {
        Scene {
            scene_id: format!("s{}", start),
            file_id: "file".to_string(),
            start,
            length,
            color_array: [0, 0, 0],
        }
    }

    #[test]
    fn test_scene_at_frame() {
        let scenes = vec![scene(0, 10), scene(10, 5), scene(15, 5)];

        assert_eq!(scene_at_frame(&scenes, 0).map(|s| s.start), Some(0));
        assert_eq!(scene_at_frame(&scenes, 12).map(|s| s.start), Some(10));
        assert_eq!(scene_at_frame(&scenes, 19).map(|s| s.start), Some(15));
        // Past the end clamps to the last scene
        assert_eq!(scene_at_frame(&scenes, 500).map(|s| s.start), Some(15));
        assert!(scene_at_frame(&[], 3).is_none());
    }

    #[test]
    fn test_clamps_below_first_scene() {
        let scenes = vec![scene(5, 5), scene(10, 5)];
        assert_eq!(scene_at_frame(&scenes, 2).map(|s| s.start), Some(5));
    }

    #[test]
    fn test_adjacent_scenes_at_cut() {
        let scenes = vec![scene(0, 10), scene(10, 5), scene(15, 5)];

        assert_eq!(adjacent_scenes_at_cut(&scenes, 10), Some((0, 1)));
        assert_eq!(adjacent_scenes_at_cut(&scenes, 15), Some((1, 2)));
        assert_eq!(adjacent_scenes_at_cut(&scenes, 0), None);
        assert_eq!(adjacent_scenes_at_cut(&scenes, 11), None);
    }

    #[test]
    fn test_is_partition() {
        assert!(is_partition(&[scene(0, 10), scene(10, 5)], 15));
        assert!(!is_partition(&[scene(0, 10), scene(11, 4)], 15));
        assert!(!is_partition(&[scene(0, 10), scene(10, 5)], 16));
        assert!(is_partition(&[], 0));
    }

    #[test]
    fn test_to_scene_color_clamps() {
        assert_eq!(to_scene_color(&[12.4, 300.0, -3.0]), [12, 255, 0]);
    }
}
