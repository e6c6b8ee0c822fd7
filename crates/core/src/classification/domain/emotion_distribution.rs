use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::shared::constants::NUM_EMOTIONS;

use super::emotion::Emotion;
use super::emotion_classifier::ClassificationError;

/// Largest deviation from a unit sum still accepted as "already
/// probabilities" before falling back to softmax.
const PROBABILITY_SUM_TOLERANCE: f32 = 1e-3;

/// Probability per emotion, summing to 1.
///
/// Serializes as a JSON object keyed by label, in label order.
#[derive(Clone, Debug, PartialEq)]
pub struct EmotionDistribution {
    probabilities: [f32; NUM_EMOTIONS],
}

impl EmotionDistribution {
    /// Interpret raw classifier output.
    ///
    /// Scores that already form a probability vector are renormalized to an
    /// exact unit sum; anything else (logits) goes through softmax.
    pub fn from_scores(scores: &[f32]) -> Result<Self, ClassificationError> {
        let scores: [f32; NUM_EMOTIONS] = scores
            .try_into()
            .map_err(|_| ClassificationError::WrongArity(scores.len()))?;
        if scores.iter().any(|s| !s.is_finite()) {
            return Err(ClassificationError::NonFinite);
        }

        let sum: f32 = scores.iter().sum();
        let is_probability = scores.iter().all(|&s| (0.0..=1.0).contains(&s))
            && (sum - 1.0).abs() <= PROBABILITY_SUM_TOLERANCE;

        let probabilities = if is_probability {
            scores.map(|s| s / sum)
        } else {
            softmax(scores)
        };
        Ok(Self { probabilities })
    }

    pub fn probability(&self, emotion: Emotion) -> f32 {
        self.probabilities[emotion.index()]
    }

    /// Most likely emotion and its probability; the lowest index wins ties.
    pub fn top(&self) -> (Emotion, f32) {
        let mut best = 0;
        for (i, &p) in self.probabilities.iter().enumerate().skip(1) {
            if p > self.probabilities[best] {
                best = i;
            }
        }
        (Emotion::ALL[best], self.probabilities[best])
    }

    pub fn iter(&self) -> impl Iterator<Item = (Emotion, f32)> + '_ {
        Emotion::ALL.iter().map(|&e| (e, self.probabilities[e.index()]))
    }
}

fn softmax(scores: [f32; NUM_EMOTIONS]) -> [f32; NUM_EMOTIONS] {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps = scores.map(|s| (s - max).exp());
    let sum: f32 = exps.iter().sum();
    exps.map(|e| e / sum)
}

impl Serialize for EmotionDistribution {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(NUM_EMOTIONS))?;
        for (emotion, p) in self.iter() {
            map.serialize_entry(emotion.label(), &p)?;
        }
        map.end()
    }
}
