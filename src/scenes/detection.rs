//! Scene detection on per-frame difference values.
//!
//! A frame whose difference value reaches the threshold is a cut candidate.
//! Cuts closer than `min_scene_length` to the previous cut are normally
//! ignored, but a candidate stronger than the frame before it moves the
//! previous cut forward instead.

use tracing::debug;

use super::{to_scene_color, Scene, SceneColor};
use crate::config::SceneConfig;
use crate::frames::{self, FrameSample, MeanColor};

/// Color given to the trailing scene, which is closed without a color probe.
pub const TRAILING_SCENE_COLOR: SceneColor = [128, 128, 128];

/// Half-open `[start, start + length)` run of frames before it becomes a [`Scene`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cut {
    start: usize,
    length: usize,
    color: SceneColor,
}

#[derive(Debug, Clone)]
pub struct SceneDetector {
    threshold: f64,
    min_scene_length: usize,
}

impl SceneDetector {
    pub fn new(threshold: f64, min_scene_length: u32) -> Self {
        Self {
            threshold,
            // A zero window would let a cut close an empty scene.
            min_scene_length: min_scene_length.max(1) as usize,
        }
    }

    pub fn from_config(config: &SceneConfig) -> Self {
        Self::new(config.threshold, config.min_scene_length)
    }

    /// Detect scenes over a dense sample array (see [`crate::frames::repair()`]).
    pub fn detect(&self, file_id: &str, samples: &[FrameSample]) -> Vec<Scene> {
        let differences = frames::difference_values(samples);
        let colors = frames::mean_colors(samples);
        self.detect_from_arrays(file_id, &differences, &colors)
    }

    /// Detect scenes from parallel difference and color arrays indexed by frame number.
    pub fn detect_from_arrays(
        &self,
        file_id: &str,
        differences: &[f64],
        colors: &[MeanColor],
    ) -> Vec<Scene> {
        if differences.is_empty() {
            return Vec::new();
        }

        let color_at = |start: usize, length: usize| {
            colors
                .get(start + length / 2)
                .map(to_scene_color)
                .unwrap_or(TRAILING_SCENE_COLOR)
        };

        let mut cuts: Vec<Cut> = Vec::new();
        let mut last_cut = 0usize;
        let mut previous: Option<f64> = None;

        for (index, &difference) in differences.iter().enumerate() {
            if difference >= self.threshold {
                if index - last_cut >= self.min_scene_length {
                    let length = index - last_cut;
                    cuts.push(Cut {
                        start: last_cut,
                        length,
                        color: color_at(last_cut, length),
                    });
                    last_cut = index;
                } else if previous.is_some_and(|p| difference > p) {
                    // A more distinct cut inside the window replaces the last one.
                    let start = cuts.pop().map_or(0, |c| c.start);
                    let length = index - start;
                    cuts.push(Cut {
                        start,
                        length,
                        color: color_at(start, length),
                    });
                    last_cut = index;
                }
            }
            previous = Some(difference);
        }

        cuts.push(Cut {
            start: last_cut,
            length: differences.len() - last_cut,
            color: TRAILING_SCENE_COLOR,
        });

        debug!(file_id, scenes = cuts.len(), frames = differences.len(), "Detected scenes");

        cuts.into_iter()
            .filter(|c| c.length > 0)
            .enumerate()
            .map(|(index, cut)| Scene {
                scene_id: format!("{}-{}", file_id, index),
                file_id: file_id.to_string(),
                start: cut.start as u32,
                length: cut.length as u32,
                color_array: cut.color,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenes::is_partition;

    fn bounds(scenes: &[Scene]) -> Vec<(u32, u32)> {
        scenes.iter().map(|s| (s.start, s.length)).collect()
    }

    fn detect(differences: &[f64], threshold: f64, min_scene_length: u32) -> Vec<Scene> {
        let colors: Vec<MeanColor> = (0..differences.len())
            .map(|i| [i as f64, 0.0, 0.0])
            .collect();
        SceneDetector::new(threshold, min_scene_length).detect_from_arrays("f", differences, &colors)
    }

    #[test]
    fn test_bootstrap_scene_then_regular_cut() {
        let scenes = detect(&[0.0, 0.0, 9.0, 0.0, 0.0, 9.0, 0.0], 5.0, 3);

        assert_eq!(bounds(&scenes), vec![(0, 2), (2, 3), (5, 2)]);
        assert!(is_partition(&scenes, 7));
    }

    #[test]
    fn test_scene_color_from_middle_frame() {
        let scenes = detect(&[0.0, 0.0, 0.0, 0.0, 9.0, 0.0], 5.0, 2);

        assert_eq!(bounds(&scenes), vec![(0, 4), (4, 2)]);
        // meanColor[0 + 4 / 2]
        assert_eq!(scenes[0].color_array, [2, 0, 0]);
        assert_eq!(scenes[1].color_array, TRAILING_SCENE_COLOR);
    }

    #[test]
    fn test_stronger_cut_within_window_replaces_previous() {
        // Cut at 4, then a stronger candidate at 5 inside the window moves it.
        let scenes = detect(&[0.0, 0.0, 0.0, 0.0, 6.0, 9.0, 0.0, 0.0, 0.0], 5.0, 3);

        assert_eq!(bounds(&scenes), vec![(0, 5), (5, 4)]);
        assert!(is_partition(&scenes, 9));
    }

    #[test]
    fn test_weaker_cut_within_window_is_ignored() {
        let scenes = detect(&[0.0, 0.0, 0.0, 0.0, 9.0, 6.0, 0.0, 0.0, 0.0], 5.0, 3);

        assert_eq!(bounds(&scenes), vec![(0, 4), (4, 5)]);
    }

    #[test]
    fn test_cut_on_first_frame_has_no_previous_value() {
        let scenes = detect(&[9.0, 0.0, 0.0], 5.0, 2);

        assert_eq!(bounds(&scenes), vec![(0, 3)]);
    }

    #[test]
    fn test_no_cuts_yields_single_scene() {
        let scenes = detect(&[1.0; 10], 5.0, 3);

        assert_eq!(bounds(&scenes), vec![(0, 10)]);
        assert_eq!(scenes[0].scene_id, "f-0");
    }

    #[test]
    fn test_empty_input_yields_no_scenes() {
        assert!(detect(&[], 5.0, 3).is_empty());
    }

    #[test]
    fn test_zero_min_length_never_produces_empty_scene() {
        let scenes = detect(&[9.0, 9.0, 9.0, 9.0], 5.0, 0);

        assert!(scenes.iter().all(|s| s.length > 0));
        assert!(is_partition(&scenes, 4));
    }

    #[test]
    fn test_partition_over_noisy_input() {
        let differences: Vec<f64> = (0..500).map(|i| ((i * 37 % 101) as f64) / 4.0).collect();
        let scenes = detect(&differences, 18.0, 5);

        assert!(is_partition(&scenes, 500));
    }
}
