use log::trace;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Output length of classifiers that carry an extra background class at index 0
pub const BACKGROUND_CLASS_OUTPUTS: usize = 1001;

/// Number of MNIST digit classes
pub const MNIST_CLASSES: usize = 10;

/// True when `a` should rank above `b`. Numbers always beat NaN.
fn outranks(a: f32, b: f32) -> bool {
    match (a.is_nan(), b.is_nan()) {
        (false, true) => true,
        (true, _) => false,
        (false, false) => a > b,
    }
}

/// Indices of the five highest scores, highest first.
///
/// Equal scores keep the earlier index first. A 1001 element vector is treated
/// as background class plus 1000 classes: element 0 is skipped and the
/// returned indices are relative to the remaining 1000.
pub fn top5(scores: &[f32]) -> Result<[usize; 5]> {
    let scores = if scores.len() == BACKGROUND_CLASS_OUTPUTS {
        &scores[1..]
    } else {
        scores
    };
    if scores.len() < 5 {
        return Err(Error::Input(format!(
            "top5 needs at least 5 scores, got {}",
            scores.len()
        )));
    }

    let mut slots: [Option<(usize, f32)>; 5] = [None; 5];
    for (index, &score) in scores.iter().enumerate() {
        let position = slots.iter().position(|slot| match slot {
            None => true,
            Some((_, held)) => outranks(score, *held),
        });
        if let Some(position) = position {
            slots.copy_within(position..4, position + 1);
            slots[position] = Some((index, score));
        }
    }

    let mut result = [0usize; 5];
    for (out, slot) in result.iter_mut().zip(slots.iter()) {
        // every slot is filled once at least five scores were seen
        *out = slot.map(|(index, _)| index).unwrap_or_default();
    }
    trace!("top5 = {:?}", result);
    Ok(result)
}

/// Index of the largest of the first `classes` scores; the first maximum wins
pub fn argmax(scores: &[f32], classes: usize) -> Result<usize> {
    let scores = &scores[..classes.min(scores.len())];
    if scores.is_empty() {
        return Err(Error::Input("argmax of an empty score vector".to_string()));
    }

    let mut best = 0;
    for (index, &score) in scores.iter().enumerate().skip(1) {
        if outranks(score, scores[best]) {
            best = index;
        }
    }
    Ok(best)
}

/// Running top-1 / top-5 tally of a classification sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccuracyAccumulator {
    pub samples_seen: usize,
    pub top1_correct: usize,
    pub top5_correct: usize,
}

impl AccuracyAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one prediction against its ground-truth label
    pub fn update(&mut self, top5: &[usize; 5], label: usize) {
        self.samples_seen += 1;
        if top5[0] == label {
            self.top1_correct += 1;
        }
        if top5.contains(&label) {
            self.top5_correct += 1;
        }
    }

    pub fn top1_ratio(&self) -> f64 {
        ratio(self.top1_correct, self.samples_seen)
    }

    pub fn top5_ratio(&self) -> f64 {
        ratio(self.top5_correct, self.samples_seen)
    }
}

/// `part / total`, zero for an empty total
pub fn ratio(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top5_descending() {
        let scores = [0.1, 0.9, 0.3, 0.7, 0.5, 0.2, 0.8];
        assert_eq!(top5(&scores).unwrap(), [1, 6, 3, 4, 2]);
    }

    #[test]
    fn test_top5_ties_prefer_earlier_index() {
        let scores = [1.0; 8];
        assert_eq!(top5(&scores).unwrap(), [0, 1, 2, 3, 4]);

        let scores = [0.0, 2.0, 1.0, 2.0, 1.0, 2.0];
        assert_eq!(top5(&scores).unwrap(), [1, 3, 5, 2, 4]);
    }

    #[test]
    fn test_top5_properties() {
        let scores: Vec<f32> = (0..100).map(|i| ((i * 37) % 101) as f32 / 7.0).collect();
        let first = top5(&scores).unwrap();
        assert_eq!(first, top5(&scores).unwrap());

        for pair in first.windows(2) {
            assert!(scores[pair[0]] >= scores[pair[1]]);
            assert_ne!(pair[0], pair[1]);
        }
        let mut sorted = first.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), 5);

        let max = scores.iter().cloned().fold(f32::MIN, f32::max);
        assert_eq!(scores[first[0]], max);
    }

    #[test]
    fn test_top5_skips_background_class() {
        let mut scores = vec![0.0f32; 1001];
        scores[0] = 100.0;
        scores[11] = 5.0;
        scores[1] = 4.0;
        let result = top5(&scores).unwrap();
        assert_eq!(result[0], 10);
        assert_eq!(result[1], 0);

        // 1000 outputs are taken as-is
        let mut scores = vec![0.0f32; 1000];
        scores[11] = 5.0;
        assert_eq!(top5(&scores).unwrap()[0], 11);
    }

    #[test]
    fn test_top5_nan_never_wins() {
        let scores = [f32::NAN, 0.1, f32::NAN, 0.3, 0.2, f32::NAN];
        let result = top5(&scores).unwrap();
        assert_eq!(&result[..3], &[3, 4, 1]);
        assert_eq!(&result[3..], &[0, 2]);
    }

    #[test]
    fn test_top5_too_short() {
        assert!(matches!(top5(&[1.0, 2.0, 3.0, 4.0]), Err(Error::Input(_))));
    }

    #[test]
    fn test_argmax() {
        let scores = [0.1, 0.5, 0.2, 0.5, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        assert_eq!(argmax(&scores, MNIST_CLASSES).unwrap(), 1);
        assert_eq!(argmax(&[1.0, 9.0, 3.0], 1).unwrap(), 0);
        assert!(argmax(&[], MNIST_CLASSES).is_err());
    }

    #[test]
    fn test_accumulator_bounds() {
        let mut acc = AccuracyAccumulator::new();
        acc.update(&[3, 1, 2, 0, 4], 3);
        acc.update(&[0, 1, 2, 3, 4], 4);
        acc.update(&[0, 1, 2, 3, 4], 9);

        assert_eq!(acc.samples_seen, 3);
        assert_eq!(acc.top1_correct, 1);
        assert_eq!(acc.top5_correct, 2);
        assert!(acc.top1_correct <= acc.top5_correct);
        assert!((acc.top1_ratio() - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(AccuracyAccumulator::new().top5_ratio(), 0.0);
    }
}
