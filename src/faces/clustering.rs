use std::collections::BTreeMap;

use tracing::debug;

use super::{DetectionRecord, FaceDetection};

/// Faces matching the first face of a frame, grouped by the frame they appear in
#[derive(Debug, Clone, PartialEq)]
pub struct FaceOccurrences {
    /// Face id of the face that was searched for
    pub face_id_of_origin: String,
    /// Frames containing at least one matching face, descriptors removed
    pub found_frames: Vec<DetectionRecord>,
}

/// Assign a face group number to every face in `records`.
///
/// Faces are visited in array order. Each face is compared to the
/// representative of every group found so far, in group order, and joins the
/// first group whose representative is closer than `threshold`. A face that
/// matches none starts a new group and becomes its representative.
///
/// This is a greedy first-match pass, not a nearest-neighbour search: group
/// numbers depend on discovery order and are kept stable for the UI.
///
/// Faces without a descriptor stay ungrouped.
///
/// Returns the number of groups.
pub fn assign_groups(records: &mut [DetectionRecord], threshold: f64) -> usize {
    let mut representatives: Vec<Vec<f32>> = Vec::new();

    for record in records.iter_mut().filter(|r| r.has_faces()) {
        for face in record.faces_array.iter_mut() {
            if face.face_descriptor.is_empty() {
                face.face_group_number = None;
                face.dist_to_origin = None;
                continue;
            }

            let matched = representatives
                .iter()
                .enumerate()
                .map(|(group, descriptor)| (group, euclidean_distance(&face.face_descriptor, descriptor)))
                .find(|&(_, distance)| distance < threshold);

            match matched {
                Some((group, distance)) => {
                    face.face_group_number = Some(group);
                    face.dist_to_origin = Some(round_distance(distance));
                }
                None => {
                    representatives.push(face.face_descriptor.clone());
                    face.face_group_number = Some(representatives.len() - 1);
                    face.dist_to_origin = Some(0.0);
                }
            }
        }
    }

    debug!(groups = representatives.len(), threshold, "Assigned face groups");
    representatives.len()
}

/// Number of faces per group across `records`.
pub fn occurrence_counts<'a>(
    records: impl IntoIterator<Item = &'a DetectionRecord>,
) -> BTreeMap<usize, usize> {
    let mut counts = BTreeMap::new();
    for group in records
        .into_iter()
        .flat_map(|r| r.faces_array.iter())
        .filter_map(|f| f.face_group_number)
    {
        *counts.entry(group).or_insert(0) += 1;
    }
    counts
}

/// Write the size of its group onto every grouped face.
pub fn insert_occurrence(records: &mut [DetectionRecord]) {
    let counts = occurrence_counts(records.iter());
    for face in records.iter_mut().flat_map(|r| r.faces_array.iter_mut()) {
        face.occurrence = face
            .face_group_number
            .and_then(|group| counts.get(&group).copied());
    }
}

/// Frame numbers of every face in `group`, in array order.
pub fn frame_numbers_of_group(records: &[DetectionRecord], group: usize) -> Vec<u32> {
    records
        .iter()
        .flat_map(|r| r.faces_array.iter())
        .filter(|f| f.face_group_number == Some(group))
        .map(|f| f.frame_number)
        .collect()
}

/// Find the frames where the first face of `frame_number` appears again.
///
/// A frame is kept once one of its faces is within `threshold`; faces that
/// come after the first match in that frame are kept too, without a distance.
pub fn occurrences_of_face(
    records: &[DetectionRecord],
    frame_number: u32,
    threshold: f64,
) -> Option<FaceOccurrences> {
    let origin = records
        .iter()
        .find(|r| r.frame_number == frame_number)?
        .faces_array
        .first()?;

    let mut found_frames = Vec::new();
    for record in records.iter().filter(|r| r.has_faces()) {
        let mut found_faces: Vec<FaceDetection> = Vec::new();
        for face in &record.faces_array {
            let distance = euclidean_distance(&face.face_descriptor, &origin.face_descriptor);
            if distance < threshold {
                found_faces.push(FaceDetection {
                    dist_to_origin: Some(distance),
                    face_descriptor: Vec::new(),
                    ..face.clone()
                });
            } else if !found_faces.is_empty() {
                found_faces.push(FaceDetection {
                    face_descriptor: Vec::new(),
                    ..face.clone()
                });
            }
        }
        if !found_faces.is_empty() {
            found_frames.push(DetectionRecord {
                faces_array: found_faces,
                ..record.clone()
            });
        }
    }

    Some(FaceOccurrences {
        face_id_of_origin: origin.face_id.clone(),
        found_frames,
    })
}

/// Drop descriptors before records are handed to the presentation layer.
pub fn strip_descriptors(records: &mut [DetectionRecord]) {
    for face in records.iter_mut().flat_map(|r| r.faces_array.iter_mut()) {
        face.face_descriptor = Vec::new();
    }
}

/// Euclidean distance between two descriptors.
///
/// Empty descriptors and descriptors of different length never match.
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f64 {
    if a.is_empty() || a.len() != b.len() {
        return f64::INFINITY;
    }

    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = f64::from(*x) - f64::from(*y);
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

/// Round to two decimals.
fn round_distance(distance: f64) -> f64 {
    (distance * 100.0 + f64::EPSILON).round() / 100.0
}
