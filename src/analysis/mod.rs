//! Per-file analysis: cached samples in, scenes and grouped faces out.
//!
//! Loading touches the store and runs on the caller's thread. Everything
//! after that is a pure transform of the loaded input, so several files are
//! analyzed in parallel with rayon.

use anyhow::Result;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::db::ScanStore;
use crate::faces::{self, DetectionRecord, SortMethod, SortParams, SortedDetection};
use crate::frames::{self, FrameSample};
use crate::scenes::{Scene, SceneDetector};

/// Settings for one analysis run, taken from a [`Config`] snapshot.
#[derive(Debug, Clone)]
pub struct AnalysisSettings {
    pub scene_threshold: f64,
    pub min_scene_length: u32,
    pub uniqueness_threshold: f64,
    pub sort_method: SortMethod,
    pub reverse: bool,
    pub sort_params: SortParams,
}

impl AnalysisSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            scene_threshold: config.scenes.threshold,
            min_scene_length: config.scenes.min_scene_length,
            uniqueness_threshold: config.faces.uniqueness_threshold,
            sort_method: config.sorting.method,
            reverse: config.sorting.reverse,
            sort_params: SortParams::default(),
        }
    }

    /// Same settings with a different sort. Used when the view changes but the data does not.
    pub fn with_sort(&self, method: SortMethod, reverse: bool, params: SortParams) -> Self {
        Self {
            sort_method: method,
            reverse,
            sort_params: params,
            ..self.clone()
        }
    }
}

/// A file to analyze and how many frames it has.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSpec {
    pub file_id: String,
    pub frame_count: u32,
}

impl FileSpec {
    pub fn new(file_id: impl Into<String>, frame_count: u32) -> Self {
        Self {
            file_id: file_id.into(),
            frame_count,
        }
    }
}

/// Everything read from the store for one file.
#[derive(Debug, Clone)]
pub struct FileInput {
    pub file_id: String,
    pub frame_count: u32,
    pub samples: Vec<FrameSample>,
    pub detections: Vec<DetectionRecord>,
    /// Face rows that could not be decoded and were left out
    pub payload_errors: usize,
}

#[derive(Debug, Clone)]
pub struct FileAnalysis {
    pub file_id: String,
    pub frame_count: u32,
    /// Frames synthesized by the gap repair
    pub repaired_frames: usize,
    pub scenes: Vec<Scene>,
    /// Detections with group numbers and occurrences filled in
    pub detections: Vec<DetectionRecord>,
    pub group_count: usize,
    pub sorted: Vec<SortedDetection>,
    pub payload_errors: usize,
}

/// Read the cached samples and face payloads of one file.
pub fn load_input(store: &ScanStore, spec: &FileSpec) -> Result<FileInput> {
    let samples = store.get_frames(&spec.file_id)?;

    let mut detections = Vec::new();
    let mut payload_errors = 0;
    for row in store.get_faces(&spec.file_id, None)? {
        match row {
            Ok(record) => detections.push(record),
            Err(_) => payload_errors += 1,
        }
    }
    if payload_errors > 0 {
        warn!(file_id = %spec.file_id, payload_errors, "Skipped malformed face payloads");
    }

    Ok(FileInput {
        file_id: spec.file_id.clone(),
        frame_count: spec.frame_count,
        samples,
        detections,
        payload_errors,
    })
}

/// Repair, segment, group and sort one file's data.
pub fn analyze(input: FileInput, settings: &AnalysisSettings) -> FileAnalysis {
    let FileInput {
        file_id,
        frame_count,
        mut samples,
        mut detections,
        payload_errors,
    } = input;

    // An unscanned file repairs to zero frames and so comes out as a single scene.
    let repaired_frames = frames::repair(&mut samples, frame_count);
    let detector = SceneDetector::new(settings.scene_threshold, settings.min_scene_length);
    let scenes = detector.detect(&file_id, &samples);

    let group_count = faces::assign_groups(&mut detections, settings.uniqueness_threshold);
    faces::insert_occurrence(&mut detections);
    let sorted = faces::sort(
        &detections,
        settings.sort_method,
        settings.reverse,
        &settings.sort_params,
    );

    debug!(
        file_id = %file_id,
        scenes = scenes.len(),
        groups = group_count,
        repaired_frames,
        "Analyzed file"
    );

    FileAnalysis {
        file_id,
        frame_count,
        repaired_frames,
        scenes,
        detections,
        group_count,
        sorted,
        payload_errors,
    }
}

pub fn analyze_file(store: &ScanStore, spec: &FileSpec, settings: &AnalysisSettings) -> Result<FileAnalysis> {
    let input = load_input(store, spec)?;
    Ok(analyze(input, settings))
}

/// Analyze several files. Reads are sequential, analysis runs in parallel.
///
/// Results come back in the order of `specs`.
pub fn analyze_files(
    store: &ScanStore,
    specs: &[FileSpec],
    settings: &AnalysisSettings,
) -> Result<Vec<FileAnalysis>> {
    let inputs = specs
        .iter()
        .map(|spec| load_input(store, spec))
        .collect::<Result<Vec<_>>>()?;

    let results: Vec<FileAnalysis> = inputs
        .into_par_iter()
        .map(|input| analyze(input, settings))
        .collect();

    info!(files = results.len(), "Analyzed files");
    Ok(results)
}

/// First frame below `frame_count` that has no difference value yet.
///
/// `None` once every frame has been scanned.
pub fn resume_point(store: &ScanStore, file_id: &str, frame_count: u32) -> Result<Option<u32>> {
    let samples = store.get_frames(file_id)?;
    let mut expected = 0u32;
    for sample in samples.iter().take_while(|s| s.frame_number < frame_count) {
        if sample.frame_number != expected {
            break;
        }
        expected += 1;
    }

    Ok((expected < frame_count).then_some(expected))
}
