//! Logit post-processing: softmax and top-K selection
//!
//! The accelerator emits one Q8.8 logit per class. [`softmax`] turns them
//! into a probability distribution and [`top_k`] ranks the classes.

use crate::fixed::to_float;

/// One ranked class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    /// Class index, below the configured class count
    pub class_id: usize,
    /// Probability in `[0.0, 1.0]`
    pub confidence: f32,
}

/// Ranked classifications, most confident first.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InferenceResult {
    /// Top classes, most confident first
    pub classifications: Vec<Classification>,
    /// Full distribution, indexed by class
    pub probabilities: Vec<f32>,
}

impl InferenceResult {
    /// Number of ranked classes.
    pub fn len(&self) -> usize {
        self.classifications.len()
    }

    /// Whether no class was ranked.
    pub fn is_empty(&self) -> bool {
        self.classifications.is_empty()
    }

    /// Most confident class.
    pub fn best(&self) -> Option<&Classification> {
        self.classifications.first()
    }
}

/// Numerically stable softmax over Q8.8 logits.
///
/// The maximum decoded logit is subtracted before exponentiating, so the
/// largest term is `exp(0) = 1` and the sum never overflows. Returns an
/// empty vector for empty input.
pub fn softmax(logits: &[i16]) -> Vec<f32> {
    let Some(max) = logits.iter().copied().map(to_float).reduce(f32::max) else {
        return Vec::new();
    };

    let mut probs: Vec<f32> = logits
        .iter()
        .map(|&l| (to_float(l) - max).exp())
        .collect();
    let sum: f32 = probs.iter().sum();
    for p in &mut probs {
        *p /= sum;
    }
    probs
}

/// Select the `k` most probable classes.
///
/// Repeated selection: each round scans the not-yet-selected classes and
/// takes the highest probability, lowest index on ties. Yields
/// `min(k, probabilities.len())` entries.
pub fn top_k(probabilities: &[f32], k: usize) -> Vec<Classification> {
    let rounds = k.min(probabilities.len());
    let mut selected = vec![false; probabilities.len()];
    let mut ranked = Vec::with_capacity(rounds);

    for _ in 0..rounds {
        let mut best: Option<(usize, f32)> = None;
        for (i, &p) in probabilities.iter().enumerate() {
            if selected[i] {
                continue;
            }
            if best.is_none_or(|(_, bp)| p > bp) {
                best = Some((i, p));
            }
        }
        let Some((class_id, confidence)) = best else {
            break;
        };
        selected[class_id] = true;
        ranked.push(Classification {
            class_id,
            confidence,
        });
    }
    ranked
}

/// Softmax followed by top-K.
pub fn rank(logits: &[i16], k: usize) -> InferenceResult {
    let probabilities = softmax(logits);
    let classifications = top_k(&probabilities, k);
    InferenceResult {
        classifications,
        probabilities,
    }
}
