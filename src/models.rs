use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::data::opt_env;
use crate::error::PredictError;
use crate::features::{FEATURE_NAMES, FeatureVector};

/// Scoring line the classification pipeline decides against.
pub const POINTS_THRESHOLD: f64 = 20.0;

/// Standardized linear model, the shape both pipelines share on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearModel {
    #[serde(default)]
    pub feature_names: Vec<String>,
    #[serde(default)]
    pub means: Vec<f64>,
    #[serde(default)]
    pub stds: Vec<f64>,
    #[serde(default)]
    pub coeffs: Vec<f64>,
    #[serde(default)]
    pub intercept: f64,
}

impl LinearModel {
    fn score(&self, input: &FeatureVector) -> f64 {
        let mut acc = self.intercept;
        for (i, value) in input.values.iter().enumerate() {
            let mean = self.means.get(i).copied().unwrap_or(0.0);
            let std = self.stds.get(i).copied().unwrap_or(1.0);
            let std = if std.abs() < f64::EPSILON { 1.0 } else { std };
            let coeff = self.coeffs.get(i).copied().unwrap_or(0.0);
            acc += coeff * ((value - mean) / std);
        }
        acc
    }

    fn check_shape(&self, kind: &str) -> Result<(), PredictError> {
        if self.coeffs.len() != FEATURE_NAMES.len() {
            return Err(PredictError::Unexpected(anyhow::anyhow!(
                "{kind} model has {} coefficients, expected {}",
                self.coeffs.len(),
                FEATURE_NAMES.len()
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct RegressionPipeline {
    model: LinearModel,
}

impl RegressionPipeline {
    pub fn predict(&self, input: &FeatureVector) -> f64 {
        self.model.score(input).max(0.0)
    }
}

#[derive(Debug, Clone)]
pub struct ClassificationPipeline {
    model: LinearModel,
}

impl ClassificationPipeline {
    pub fn predict(&self, input: &FeatureVector) -> bool {
        sigmoid(self.model.score(input)) >= 0.5
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictionResult {
    pub points: f64,
    pub exceeds_threshold: bool,
}

/// Load the season's pipelines. With `HOOPS_MODEL_DIR` set, both model files
/// must exist (a missing file is fatal for the session); without it the
/// bundled demo weights are used.
pub fn load_models(
    season: &str,
) -> Result<(RegressionPipeline, ClassificationPipeline), PredictError> {
    let Some(dir) = opt_env("HOOPS_MODEL_DIR").map(PathBuf::from) else {
        return Ok((
            RegressionPipeline {
                model: default_regressor(),
            },
            ClassificationPipeline {
                model: default_classifier(),
            },
        ));
    };

    let regressor = load_model_file(&dir, season, "regressor.json")?;
    regressor.check_shape("regression")?;
    let classifier = load_model_file(&dir, season, "classifier.json")?;
    classifier.check_shape("classification")?;

    Ok((
        RegressionPipeline { model: regressor },
        ClassificationPipeline { model: classifier },
    ))
}

fn load_model_file(dir: &Path, season: &str, file: &str) -> Result<LinearModel, PredictError> {
    let path = dir.join(season).join(file);
    let raw = match fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(PredictError::ResourceMissing(format!(
                "Model file missing: {}",
                path.display()
            )));
        }
        Err(err) => {
            return Err(PredictError::Unexpected(
                anyhow::Error::new(err)
                    .context(format!("failed to read model file {}", path.display())),
            ));
        }
    };
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse model file {}", path.display()))
        .map_err(PredictError::Unexpected)
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

// Demo weights tuned on the bundled sample feed: mostly recent scoring,
// nudged by opponent defense and venue mix.
fn default_regressor() -> LinearModel {
    LinearModel {
        feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
        means: vec![18.0, 18.0, 18.0, 0.5, 6.0, 5.0],
        stds: vec![6.0, 6.0, 3.0, 0.25, 2.5, 2.5],
        coeffs: vec![3.4, 2.2, 1.1, 0.5, 0.2, 0.3],
        intercept: 18.0,
    }
}

fn default_classifier() -> LinearModel {
    LinearModel {
        feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
        means: vec![POINTS_THRESHOLD, POINTS_THRESHOLD, 18.0, 0.5, 6.0, 5.0],
        stds: vec![6.0, 6.0, 3.0, 0.25, 2.5, 2.5],
        coeffs: vec![1.6, 1.0, 0.5, 0.2, 0.1, 0.1],
        intercept: 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(points: f64) -> FeatureVector {
        FeatureVector {
            values: [points, points, 18.0, 0.5, 6.0, 5.0],
        }
    }

    #[test]
    fn default_models_cover_every_feature() {
        let (regressor, classifier) = load_models("2023-24").expect("defaults load");
        assert_eq!(regressor.model.coeffs.len(), FEATURE_NAMES.len());
        assert_eq!(classifier.model.coeffs.len(), FEATURE_NAMES.len());
    }

    #[test]
    fn regression_tracks_scoring_form() {
        let (regressor, _) = load_models("2023-24").expect("defaults load");
        let low = regressor.predict(&input(10.0));
        let high = regressor.predict(&input(30.0));
        assert!(high > low);
        assert!(low >= 0.0);
    }

    #[test]
    fn classifier_splits_around_the_threshold() {
        let (_, classifier) = load_models("2023-24").expect("defaults load");
        assert!(!classifier.predict(&input(10.0)));
        assert!(classifier.predict(&input(32.0)));
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let model = LinearModel {
            feature_names: Vec::new(),
            means: Vec::new(),
            stds: Vec::new(),
            coeffs: vec![1.0, 2.0],
            intercept: 0.0,
        };
        assert!(model.check_shape("regression").is_err());
    }
}
