//! Face detections delivered by the probe and the grouping/sorting built on them.
//!
//! The probe serializes each scanned frame as a [`DetectionRecord`] (camelCase
//! JSON, stored verbatim in the scan table). Group numbers, distances and
//! occurrence counts are filled in later by [`clustering`].

pub mod clustering;
pub mod sorting;

use serde::{Deserialize, Serialize};

pub use clustering::{assign_groups, insert_occurrence};
pub use sorting::{sort, SortMethod, SortParams, SortedDetection};

/// Bounding box for a detected face
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// A detected face in a frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceDetection {
    pub frame_number: u32,
    pub face_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub face_descriptor: Vec<f32>,
    #[serde(rename = "box", default)]
    pub bounding_box: BoundingBox,
    #[serde(default)]
    pub size: f64,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face_group_number: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dist_to_origin: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occurrence: Option<usize>,
}

impl FaceDetection {
    pub fn new(
        frame_number: u32,
        face_id: impl Into<String>,
        face_descriptor: Vec<f32>,
        bounding_box: BoundingBox,
        score: f64,
    ) -> Self {
        Self {
            frame_number,
            face_id: face_id.into(),
            face_descriptor,
            bounding_box,
            size: bounding_box.width.max(bounding_box.height),
            score,
            face_group_number: None,
            dist_to_origin: None,
            occurrence: None,
        }
    }

    /// The first member of its group.
    pub fn is_origin(&self) -> bool {
        self.dist_to_origin == Some(0.0)
    }
}

/// Face scan result for one frame. Frames without faces carry an empty `faces_array`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionRecord {
    pub frame_number: u32,
    pub face_count: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub faces_array: Vec<FaceDetection>,
    #[serde(default)]
    pub largest_size: f64,
}

impl DetectionRecord {
    pub fn empty(frame_number: u32) -> Self {
        Self {
            frame_number,
            face_count: 0,
            faces_array: Vec::new(),
            largest_size: 0.0,
        }
    }

    pub fn with_faces(frame_number: u32, faces: Vec<FaceDetection>) -> Self {
        let largest_size = faces.iter().map(|f| f.size).fold(0.0, f64::max);
        Self {
            frame_number,
            face_count: faces.len(),
            faces_array: faces,
            largest_size,
        }
    }

    pub fn has_faces(&self) -> bool {
        self.face_count != 0
    }
}
