//! Ordered and filtered views over face detections.

use std::cmp::Ordering;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::{clustering, DetectionRecord, FaceDetection};

/// How detections are sorted and filtered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMethod {
    FrameNumber,
    #[default]
    FaceSize,
    FaceCount,
    FaceConfidence,
    FaceOccurrence,
    DistToOrigin,
    Unique,
}

impl SortMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortMethod::FrameNumber => "framenumber",
            SortMethod::FaceSize => "facesize",
            SortMethod::FaceCount => "facecount",
            SortMethod::FaceConfidence => "faceconfidence",
            SortMethod::FaceOccurrence => "faceoccurrence",
            SortMethod::DistToOrigin => "disttoorigin",
            SortMethod::Unique => "unique",
        }
    }

    /// Methods that look at individual faces rather than whole frames.
    pub fn is_flattened(&self) -> bool {
        !matches!(
            self,
            SortMethod::FrameNumber | SortMethod::FaceSize | SortMethod::FaceCount
        )
    }

    /// Methods that only make sense once faces carry a group number.
    pub fn needs_groups(&self) -> bool {
        matches!(
            self,
            SortMethod::FaceOccurrence | SortMethod::DistToOrigin | SortMethod::Unique
        )
    }
}

impl std::fmt::Display for SortMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extra inputs some sort methods need.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SortParams {
    /// Group whose faces [`SortMethod::DistToOrigin`] ranks
    pub origin_group: Option<usize>,
}

/// One entry of a sorted view: the frame fields, plus the face for face-level methods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortedDetection {
    pub frame_number: u32,
    pub face_count: usize,
    pub largest_size: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face: Option<FaceDetection>,
}

impl SortedDetection {
    fn frame(record: &DetectionRecord) -> Self {
        Self {
            frame_number: record.frame_number,
            face_count: record.face_count,
            largest_size: record.largest_size,
            face: None,
        }
    }

    fn face(&self) -> Option<&FaceDetection> {
        self.face.as_ref()
    }
}

/// Sort and filter `records` according to `method`.
///
/// `reverse` flips every comparison. The sort is stable, so entries that
/// compare equal keep their input order.
pub fn sort(
    records: &[DetectionRecord],
    method: SortMethod,
    reverse: bool,
    params: &SortParams,
) -> Vec<SortedDetection> {
    let with_faces: Vec<&DetectionRecord> = records.iter().filter(|r| r.has_faces()).collect();

    if method.needs_groups()
        && !with_faces
            .iter()
            .flat_map(|r| r.faces_array.iter())
            .any(|f| f.face_group_number.is_some())
    {
        return Vec::new();
    }

    let mut entries: Vec<SortedDetection> = match method {
        SortMethod::FrameNumber => records.iter().map(SortedDetection::frame).collect(),
        _ if !method.is_flattened() => with_faces.iter().map(|r| SortedDetection::frame(r)).collect(),
        _ => flatten(&with_faces, method.needs_groups()),
    };

    if method == SortMethod::DistToOrigin {
        let Some(group) = params.origin_group else {
            return Vec::new();
        };
        entries.retain(|e| e.face().and_then(|f| f.face_group_number) == Some(group));
    }

    entries.sort_by(|a, b| {
        let ordering = compare(method, a, b);
        if reverse {
            ordering.reverse()
        } else {
            ordering
        }
    });

    match method {
        SortMethod::FaceConfidence | SortMethod::FaceOccurrence | SortMethod::DistToOrigin => {
            let mut seen = HashSet::new();
            entries.retain(|e| seen.insert(e.frame_number));
        }
        SortMethod::Unique => {
            let mut seen = HashSet::new();
            entries.retain(|e| match e.face() {
                Some(face) if face.is_origin() => seen.insert(face.face_group_number),
                _ => false,
            });
        }
        _ => {}
    }

    entries
}

/// One entry per face, with the occurrence recomputed over the faces given.
fn flatten(records: &[&DetectionRecord], with_occurrence: bool) -> Vec<SortedDetection> {
    let counts = with_occurrence.then(|| clustering::occurrence_counts(records.iter().copied()));

    records
        .iter()
        .flat_map(|record| {
            let counts = counts.as_ref();
            record.faces_array.iter().map(move |face| {
                let mut face = face.clone();
                if let Some(counts) = counts {
                    face.occurrence = face
                        .face_group_number
                        .and_then(|group| counts.get(&group).copied());
                }
                SortedDetection {
                    face: Some(face),
                    ..SortedDetection::frame(record)
                }
            })
        })
        .collect()
}

/// Default-direction comparison for `method`; `Less` sorts first.
fn compare(method: SortMethod, a: &SortedDetection, b: &SortedDetection) -> Ordering {
    let face_a = a.face();
    let face_b = b.face();
    let score = |f: Option<&FaceDetection>| f.map_or(0.0, |f| f.score);
    let size = |f: Option<&FaceDetection>| f.map_or(0.0, |f| f.size);
    let occurrence = |f: Option<&FaceDetection>| f.and_then(|f| f.occurrence);
    let distance = |f: Option<&FaceDetection>| f.and_then(|f| f.dist_to_origin).unwrap_or(f64::INFINITY);

    match method {
        SortMethod::FrameNumber => a.frame_number.cmp(&b.frame_number),
        SortMethod::FaceSize => b.largest_size.total_cmp(&a.largest_size),
        SortMethod::FaceCount => b.face_count.cmp(&a.face_count),
        SortMethod::FaceConfidence => score(face_b).total_cmp(&score(face_a)),
        SortMethod::FaceOccurrence | SortMethod::Unique => occurrence(face_b)
            .cmp(&occurrence(face_a))
            .then_with(|| size(face_b).total_cmp(&size(face_a)))
            .then_with(|| score(face_b).total_cmp(&score(face_a))),
        SortMethod::DistToOrigin => distance(face_a).total_cmp(&distance(face_b)),
    }
}
