//! Scorer abstraction plus the bundled feed-forward model.
//!
//! The core only sees `Arc<dyn Scorer>`. [`MlpScorer`] is the stock
//! implementation: dense layers with ReLU between them, weights stored as
//! JSON. [`load_scorer`] is the bootstrap contract: it either yields a
//! working scorer or logs why not and returns `None`.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ScoreError;

/// Black-box `features -> score` function. May be CPU-heavy; the dispatcher
/// always runs it on a blocking worker.
pub trait Scorer: Send + Sync + 'static {
    fn score(&self, features: &[f64]) -> Result<f64, ScoreError>;
}

impl<F> Scorer for F
where
    F: Fn(&[f64]) -> Result<f64, ScoreError> + Send + Sync + 'static,
{
    fn score(&self, features: &[f64]) -> Result<f64, ScoreError> {
        self(features)
    }
}

/// Shared handle passed into the dispatcher.
pub type DynScorer = Arc<dyn Scorer>;

/// One dense layer: `out[i] = bias[i] + sum_j weights[i][j] * in[j]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    pub weights: Vec<Vec<f64>>,
    pub bias: Vec<f64>,
}

impl DenseLayer {
    fn in_dim(&self) -> usize {
        self.weights.first().map_or(0, Vec::len)
    }

    fn out_dim(&self) -> usize {
        self.bias.len()
    }

    fn forward(&self, x: &[f64]) -> Vec<f64> {
        self.weights
            .iter()
            .zip(&self.bias)
            .map(|(row, b)| b + row.iter().zip(x).map(|(w, v)| w * v).sum::<f64>())
            .collect()
    }
}

/// Multi-layer perceptron, ReLU on every layer except the last. The last
/// layer must have exactly one output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MlpScorer {
    pub layers: Vec<DenseLayer>,
}

impl MlpScorer {
    /// Build from layers, checking that the shapes chain together.
    pub fn new(layers: Vec<DenseLayer>) -> Result<Self> {
        let Some(last) = layers.last() else {
            bail!("model has no layers");
        };
        if last.out_dim() != 1 {
            bail!("final layer must have 1 output, got {}", last.out_dim());
        }
        for (i, l) in layers.iter().enumerate() {
            if l.weights.len() != l.bias.len() {
                bail!(
                    "layer {i}: {} weight rows but {} biases",
                    l.weights.len(),
                    l.bias.len()
                );
            }
            if l.weights.iter().any(|row| row.len() != l.in_dim()) {
                bail!("layer {i}: ragged weight matrix");
            }
        }
        for (i, pair) in layers.windows(2).enumerate() {
            if pair[0].out_dim() != pair[1].in_dim() {
                bail!(
                    "layer {} outputs {} values but layer {} expects {}",
                    i,
                    pair[0].out_dim(),
                    i + 1,
                    pair[1].in_dim()
                );
            }
        }
        Ok(Self { layers })
    }

    /// `in_dim -> hidden -> hidden -> 1` with weights uniform in [-0.1, 0.1].
    pub fn random(in_dim: usize, hidden: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut layer = |inp: usize, out: usize| DenseLayer {
            weights: (0..out)
                .map(|_| (0..inp).map(|_| rng.random_range(-0.1..=0.1)).collect())
                .collect(),
            bias: (0..out).map(|_| rng.random_range(-0.1..=0.1)).collect(),
        };
        let layers = vec![layer(in_dim, hidden), layer(hidden, hidden), layer(hidden, 1)];
        Self { layers }
    }

    pub fn input_dim(&self) -> usize {
        self.layers.first().map_or(0, DenseLayer::in_dim)
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let raw: MlpScorer = serde_json::from_str(s).context("parsing model json")?;
        Self::new(raw.layers)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading model from {}", path.display()))?;
        Self::from_json_str(&data).with_context(|| format!("loading model {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_string(self)?;
        fs::write(path, data).with_context(|| format!("writing model to {}", path.display()))
    }
}

impl Scorer for MlpScorer {
    fn score(&self, features: &[f64]) -> Result<f64, ScoreError> {
        if features.len() != self.input_dim() {
            return Err(ScoreError::failed(format!(
                "expected {} features, got {}",
                self.input_dim(),
                features.len()
            )));
        }
        let last = self.layers.len().saturating_sub(1);
        let mut x = features.to_vec();
        for (i, layer) in self.layers.iter().enumerate() {
            x = layer.forward(&x);
            if i != last {
                x.iter_mut().for_each(|v| *v = v.max(0.0));
            }
        }
        match x.as_slice() {
            [y] if y.is_finite() => Ok(*y),
            [y] => Err(ScoreError::failed(format!("non-finite score {y}"))),
            _ => Err(ScoreError::failed("model produced no output")),
        }
    }
}

/// Load the model at `path`. Never fails the process: on error the
/// service starts without a scorer and every score call reports
/// [`ScoreError::Unavailable`].
pub fn load_scorer(path: &Path) -> Option<DynScorer> {
    match MlpScorer::load(path) {
        Ok(m) => {
            info!(
                target: "scorer",
                path = %path.display(),
                input_dim = m.input_dim(),
                layers = m.layers.len(),
                "model loaded"
            );
            Some(Arc::new(m))
        }
        Err(e) => {
            warn!(
                target: "scorer",
                path = %path.display(),
                error = ?e,
                "could not load model; scoring disabled until restart"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny() -> MlpScorer {
        // 2 -> 2 (relu) -> 1
        MlpScorer::new(vec![
            DenseLayer {
                weights: vec![vec![1.0, 0.0], vec![0.0, -1.0]],
                bias: vec![0.0, 0.0],
            },
            DenseLayer {
                weights: vec![vec![2.0, 3.0]],
                bias: vec![0.5],
            },
        ])
        .unwrap()
    }

    #[test]
    fn forward_applies_relu_between_layers() {
        let m = tiny();
        // hidden = relu([1, -2]) = [1, 0]; out = 0.5 + 2*1 + 3*0
        assert_eq!(m.score(&[1.0, 2.0]).unwrap(), 2.5);
        // hidden = relu([-1, 2]) = [0, 2]; out = 0.5 + 6
        assert_eq!(m.score(&[-1.0, -2.0]).unwrap(), 6.5);
    }

    #[test]
    fn wrong_feature_count_fails() {
        let err = tiny().score(&[1.0]).unwrap_err();
        assert!(matches!(err, ScoreError::Failed(_)));
    }

    #[test]
    fn non_finite_output_fails() {
        let err = tiny().score(&[f64::INFINITY, 0.0]).unwrap_err();
        assert!(matches!(err, ScoreError::Failed(_)));
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let bad = MlpScorer::new(vec![
            DenseLayer {
                weights: vec![vec![1.0, 1.0]],
                bias: vec![0.0],
            },
            DenseLayer {
                weights: vec![vec![1.0, 1.0]],
                bias: vec![0.0],
            },
        ]);
        assert!(bad.is_err());
        assert!(MlpScorer::new(vec![]).is_err());
    }

    #[test]
    fn random_model_is_deterministic_and_bounded() {
        let a = MlpScorer::random(3, 16, 7);
        let b = MlpScorer::random(3, 16, 7);
        assert_eq!(a, b);
        assert_eq!(a.input_dim(), 3);
        assert!(a
            .layers
            .iter()
            .flat_map(|l| l.weights.iter().flatten().chain(&l.bias))
            .all(|w| (-0.1..=0.1).contains(w)));
        assert!(a.score(&[0.1, 0.2, 0.3]).unwrap().is_finite());
    }

    #[test]
    fn save_then_load_scores_identically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let m = MlpScorer::random(3, 8, 1);
        m.save(&path).unwrap();
        let loaded = load_scorer(&path).expect("model should load");
        let x = [0.4, -0.2, 0.9];
        assert_eq!(loaded.score(&x).unwrap(), m.score(&x).unwrap());
    }

    #[test]
    fn missing_model_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_scorer(&dir.path().join("absent.json")).is_none());
    }

    #[test]
    fn closures_are_scorers() {
        let s: DynScorer = Arc::new(|f: &[f64]| Ok::<f64, ScoreError>(f.iter().sum()));
        assert_eq!(s.score(&[1.0, 2.0]).unwrap(), 3.0);
    }
}
