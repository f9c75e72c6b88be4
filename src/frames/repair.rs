//! Densifies frame scan data so that `samples[i].frame_number == i`.
//!
//! Probing can be interrupted or deliver batches out of order, so the rows read
//! back from the store may have holes. A missing frame is filled with a copy of
//! the frame before it; a missing first frame is filled with a zero sample.

use tracing::{debug, info};

use super::FrameSample;

/// Returns true if `samples` already holds exactly `frame_count` entries indexed by frame number.
pub fn is_dense(samples: &[FrameSample], frame_count: u32) -> bool {
    samples.len() == frame_count as usize
        && samples
            .iter()
            .enumerate()
            .all(|(i, s)| s.frame_number as usize == i)
}

/// Repair `samples` in place so it covers `[0, frame_count)` without holes.
///
/// Returns the number of synthesized frames. Running it on dense data is a no-op.
pub fn repair(samples: &mut Vec<FrameSample>, frame_count: u32) -> usize {
    if is_dense(samples, frame_count) {
        return 0;
    }

    let mut ordered = std::mem::take(samples);
    ordered.sort_by_key(|s| s.frame_number);

    // Later deliveries of the same frame win, frames past the end are dropped.
    let mut unique: Vec<FrameSample> = Vec::with_capacity(ordered.len());
    for sample in ordered {
        if sample.frame_number >= frame_count {
            continue;
        }
        match unique.last_mut() {
            Some(last) if last.frame_number == sample.frame_number => *last = sample,
            _ => unique.push(sample),
        }
    }

    let mut incoming = unique.into_iter().peekable();
    let mut dense: Vec<FrameSample> = Vec::with_capacity(frame_count as usize);
    let mut repaired = 0;

    for frame_number in 0..frame_count {
        if let Some(sample) = incoming.next_if(|s| s.frame_number == frame_number) {
            dense.push(sample);
            continue;
        }

        let filler = match dense.last() {
            Some(previous) => FrameSample {
                frame_number,
                ..previous.clone()
            },
            None => FrameSample::zero(frame_number),
        };
        debug!(frame_number, "Repaired frame scan data");
        dense.push(filler);
        repaired += 1;
    }

    if repaired > 0 {
        info!(repaired, frame_count, "Frame scan data had gaps");
    }

    *samples = dense;
    repaired
}
