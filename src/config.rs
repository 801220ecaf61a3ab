use serde::{Deserialize, Serialize};

use crate::model::condition::Score;
use crate::model::entity::ConstraintPriority;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OptimizerConfig {
    /// Seed of the refinement search. Equal seeds give equal results.
    pub seed: u64,
    /// Leave pending guests that already hold a seat where they are.
    pub keep_pending_seated: bool,
    /// Score of two co-seated guests with no bond between them.
    pub unrelated_pair_score: Score,
    pub constraint_weights: ConstraintWeights,
    pub anneal: AnnealParams,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            seed: 0x5EA7,
            keep_pending_seated: false,
            unrelated_pair_score: 0.0,
            constraint_weights: ConstraintWeights::default(),
            anneal: AnnealParams::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstraintWeights {
    pub required: u32,
    pub preferred: u32,
}

impl ConstraintWeights {
    pub fn weight(&self, priority: ConstraintPriority) -> u32 {
        match priority {
            ConstraintPriority::Required => self.required,
            ConstraintPriority::Preferred => self.preferred,
        }
    }
}

impl Default for ConstraintWeights {
    fn default() -> Self {
        Self { required: 10, preferred: 3 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnnealParams {
    pub temperature: f64,
    pub cooling_rate: f64,
    pub max_iterations: usize,
}

impl Default for AnnealParams {
    fn default() -> Self {
        Self {
            temperature: 2.0,
            cooling_rate: 0.995,
            max_iterations: 4000,
        }
    }
}
