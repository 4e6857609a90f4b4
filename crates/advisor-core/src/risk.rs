//! Conflict risk scoring for alert triage.
//!
//! A binary classifier over pairwise encounter geometry, used to rank the
//! geometric detector's output for display priority. It is advisory only:
//! a geometric conflict stands whatever this model says, and scoring
//! failures degrade to "no score", never to a missing conflict.
//!
//! The classifier is a standardized logistic regression trained by
//! full-batch gradient descent on labeled encounters, typically the
//! synthetic set from [`synthetic_training_set`].

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::FlightState;
use crate::spatial::{haversine_nm, track_angle_difference};

const FEATURE_COUNT: usize = 5;
const MIN_TRAINING_SAMPLES: usize = 10;
const EPOCHS: usize = 300;
const LEARNING_RATE: f64 = 0.5;

#[derive(Debug, Error)]
pub enum RiskModelError {
    #[error("training set too small: {0} samples (minimum {MIN_TRAINING_SAMPLES})")]
    TooFewSamples(usize),
    #[error("training set is degenerate: all samples share one label")]
    SingleClass,
    #[error("non-finite value in encounter features")]
    NonFiniteFeature,
    #[error("model has not been trained")]
    Untrained,
}

/// Pairwise geometry features the classifier scores.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EncounterFeatures {
    pub horizontal_distance_nm: f64,
    /// Rate at which horizontal separation is decreasing, in knots.
    /// Negative when the pair is diverging.
    pub closing_speed_kt: f64,
    pub altitude_difference_ft: f64,
    pub vertical_rate_difference_fpm: f64,
    pub track_angle_difference_deg: f64,
}

impl EncounterFeatures {
    /// Derive features from two flight states.
    pub fn extract(a: &FlightState, b: &FlightState) -> Result<Self, RiskModelError> {
        let features = Self {
            horizontal_distance_nm: haversine_nm(a.latitude, a.longitude, b.latitude, b.longitude),
            closing_speed_kt: closing_speed_kt(a, b),
            altitude_difference_ft: (a.geo_altitude_ft() - b.geo_altitude_ft()).abs(),
            vertical_rate_difference_fpm: (a.effective_vertical_rate_fpm()
                - b.effective_vertical_rate_fpm())
            .abs(),
            track_angle_difference_deg: track_angle_difference(a.true_track_deg, b.true_track_deg),
        };
        if features.as_array().iter().all(|v| v.is_finite()) {
            Ok(features)
        } else {
            Err(RiskModelError::NonFiniteFeature)
        }
    }

    fn as_array(&self) -> [f64; FEATURE_COUNT] {
        [
            self.horizontal_distance_nm,
            self.closing_speed_kt,
            self.altitude_difference_ft,
            self.vertical_rate_difference_fpm,
            self.track_angle_difference_deg,
        ]
    }
}

/// Projection of the pair's relative velocity onto the line between them.
/// Positive means separation is shrinking.
fn closing_speed_kt(a: &FlightState, b: &FlightState) -> f64 {
    // Local flat projection in NM around the pair's mean latitude.
    let mean_lat = ((a.latitude + b.latitude) / 2.0).to_radians();
    let dx = (b.longitude - a.longitude) * 60.0 * mean_lat.cos();
    let dy = (b.latitude - a.latitude) * 60.0;
    let range = (dx * dx + dy * dy).sqrt();
    if range < 1e-9 {
        // Coincident positions: already at zero range, nothing to close.
        return 0.0;
    }

    let (avn, ave) = velocity_components_kt(a);
    let (bvn, bve) = velocity_components_kt(b);
    let rel_ve = bve - ave;
    let rel_vn = bvn - avn;

    // Range rate is (rel_pos . rel_vel) / |rel_pos|; closing is its negation.
    -((dx * rel_ve + dy * rel_vn) / range)
}

fn velocity_components_kt(f: &FlightState) -> (f64, f64) {
    let track = f.true_track_deg.to_radians();
    (f.velocity_kt * track.cos(), f.velocity_kt * track.sin())
}

/// One labeled training example.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabeledEncounter {
    pub features: EncounterFeatures,
    pub conflict: bool,
}

/// Accuracy of a completed training run, measured on the held-out split.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TrainingReport {
    pub train_accuracy: f64,
    pub test_accuracy: f64,
}

/// Risk score for one aircraft pair.
///
/// `error` is populated instead of panicking when features cannot be
/// derived or the model is untrained; the scores then stay at 0.0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Probability of conflict, in [0, 1]
    pub conflict_probability: f64,
    /// Distance from the decision boundary, in [0, 1]
    pub confidence: f64,
    pub error: Option<String>,
}

impl RiskAssessment {
    fn unavailable(error: impl Into<String>) -> Self {
        Self {
            conflict_probability: 0.0,
            confidence: 0.0,
            error: Some(error.into()),
        }
    }
}

/// Trained conflict risk classifier.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConflictRiskModel {
    weights: [f64; FEATURE_COUNT],
    bias: f64,
    feature_means: [f64; FEATURE_COUNT],
    feature_stds: [f64; FEATURE_COUNT],
    trained: bool,
}

impl ConflictRiskModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_trained(&self) -> bool {
        self.trained
    }

    /// Fit the classifier on a labeled set.
    ///
    /// Shuffles, holds out 20% for evaluation, standardizes features on the
    /// training fold and runs gradient descent. A degenerate set (too few
    /// samples, one class) is surfaced as an error and leaves any previous
    /// fit untouched; callers fall back to geometric detection alone.
    pub fn train(&mut self, dataset: &[LabeledEncounter]) -> Result<TrainingReport, RiskModelError> {
        if dataset.len() < MIN_TRAINING_SAMPLES {
            return Err(RiskModelError::TooFewSamples(dataset.len()));
        }
        if dataset.iter().all(|s| s.conflict) || dataset.iter().all(|s| !s.conflict) {
            return Err(RiskModelError::SingleClass);
        }
        for sample in dataset {
            if !sample.features.as_array().iter().all(|v| v.is_finite()) {
                return Err(RiskModelError::NonFiniteFeature);
            }
        }

        let mut shuffled: Vec<&LabeledEncounter> = dataset.iter().collect();
        shuffled.shuffle(&mut rand::rng());
        let test_len = (shuffled.len() / 5).max(1);
        let (test, train) = shuffled.split_at(test_len);
        if train.iter().all(|s| s.conflict) || train.iter().all(|s| !s.conflict) {
            return Err(RiskModelError::SingleClass);
        }

        let (means, stds) = fit_standardization(train);
        let train_x: Vec<[f64; FEATURE_COUNT]> = train
            .iter()
            .map(|s| standardize(s.features.as_array(), &means, &stds))
            .collect();
        let train_y: Vec<f64> = train
            .iter()
            .map(|s| if s.conflict { 1.0 } else { 0.0 })
            .collect();

        let mut weights = [0.0; FEATURE_COUNT];
        let mut bias = 0.0;
        let n = train_x.len() as f64;
        for _ in 0..EPOCHS {
            let mut grad_w = [0.0; FEATURE_COUNT];
            let mut grad_b = 0.0;
            for (x, &y) in train_x.iter().zip(&train_y) {
                let err = sigmoid(dot(&weights, x) + bias) - y;
                for k in 0..FEATURE_COUNT {
                    grad_w[k] += err * x[k];
                }
                grad_b += err;
            }
            for k in 0..FEATURE_COUNT {
                weights[k] -= LEARNING_RATE * grad_w[k] / n;
            }
            bias -= LEARNING_RATE * grad_b / n;
        }

        self.weights = weights;
        self.bias = bias;
        self.feature_means = means;
        self.feature_stds = stds;
        self.trained = true;

        Ok(TrainingReport {
            train_accuracy: self.accuracy(train),
            test_accuracy: self.accuracy(test),
        })
    }

    fn accuracy(&self, samples: &[&LabeledEncounter]) -> f64 {
        if samples.is_empty() {
            return 0.0;
        }
        let correct = samples
            .iter()
            .filter(|s| (self.probability(&s.features) >= 0.5) == s.conflict)
            .count();
        correct as f64 / samples.len() as f64
    }

    fn probability(&self, features: &EncounterFeatures) -> f64 {
        let x = standardize(
            features.as_array(),
            &self.feature_means,
            &self.feature_stds,
        );
        sigmoid(dot(&self.weights, &x) + self.bias)
    }

    /// Score an aircraft pair.
    ///
    /// Never panics: feature extraction failures and an untrained model are
    /// reported through the `error` field with both scores at 0.0.
    pub fn predict(&self, a: &FlightState, b: &FlightState) -> RiskAssessment {
        if !self.trained {
            return RiskAssessment::unavailable(RiskModelError::Untrained.to_string());
        }
        let features = match EncounterFeatures::extract(a, b) {
            Ok(features) => features,
            Err(e) => return RiskAssessment::unavailable(e.to_string()),
        };
        let probability = self.probability(&features);
        RiskAssessment {
            conflict_probability: probability,
            confidence: (probability - 0.5).abs() * 2.0,
            error: None,
        }
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

fn dot(w: &[f64; FEATURE_COUNT], x: &[f64; FEATURE_COUNT]) -> f64 {
    w.iter().zip(x).map(|(a, b)| a * b).sum()
}

fn fit_standardization(
    samples: &[&LabeledEncounter],
) -> ([f64; FEATURE_COUNT], [f64; FEATURE_COUNT]) {
    let n = samples.len() as f64;
    let mut means = [0.0; FEATURE_COUNT];
    for s in samples {
        let x = s.features.as_array();
        for k in 0..FEATURE_COUNT {
            means[k] += x[k] / n;
        }
    }
    let mut stds = [0.0; FEATURE_COUNT];
    for s in samples {
        let x = s.features.as_array();
        for k in 0..FEATURE_COUNT {
            stds[k] += (x[k] - means[k]).powi(2) / n;
        }
    }
    for s in &mut stds {
        *s = s.sqrt().max(1e-9);
    }
    (means, stds)
}

fn standardize(
    x: [f64; FEATURE_COUNT],
    means: &[f64; FEATURE_COUNT],
    stds: &[f64; FEATURE_COUNT],
) -> [f64; FEATURE_COUNT] {
    let mut out = [0.0; FEATURE_COUNT];
    for k in 0..FEATURE_COUNT {
        out[k] = (x[k] - means[k]) / stds[k];
    }
    out
}

/// Generate a labeled set of random encounter geometries for bootstrap
/// training, labeled by the separation rule of thumb the detector enforces.
pub fn synthetic_training_set<R: Rng>(count: usize, rng: &mut R) -> Vec<LabeledEncounter> {
    (0..count)
        .map(|_| {
            let features = EncounterFeatures {
                horizontal_distance_nm: rng.random_range(0.0..50.0),
                closing_speed_kt: rng.random_range(-200.0..800.0),
                altitude_difference_ft: rng.random_range(0.0..6000.0),
                vertical_rate_difference_fpm: rng.random_range(0.0..3000.0),
                track_angle_difference_deg: rng.random_range(0.0..180.0),
            };
            LabeledEncounter {
                conflict: synthetic_label(&features),
                features,
            }
        })
        .collect()
}

fn synthetic_label(f: &EncounterFeatures) -> bool {
    if f.altitude_difference_ft >= 1000.0 {
        return false;
    }
    if f.horizontal_distance_nm < 5.0 {
        return true;
    }
    // Closing pairs that would erode separation inside a 10-minute horizon.
    f.closing_speed_kt > 0.0 && f.horizontal_distance_nm / (f.closing_speed_kt / 60.0) < 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trained_model() -> ConflictRiskModel {
        let mut model = ConflictRiskModel::new();
        let dataset = synthetic_training_set(2000, &mut rand::rng());
        model.train(&dataset).expect("synthetic set must train");
        model
    }

    #[test]
    fn training_reports_reasonable_accuracy() {
        let mut model = ConflictRiskModel::new();
        let dataset = synthetic_training_set(2000, &mut rand::rng());
        let report = model.train(&dataset).unwrap();
        assert!(report.train_accuracy > 0.8, "train {}", report.train_accuracy);
        assert!(report.test_accuracy > 0.75, "test {}", report.test_accuracy);
    }

    #[test]
    fn converging_pair_scores_higher_than_distant_pair() {
        let model = trained_model();

        let a = FlightState::new("cnv001", 0.0, 0.0, 30_000.0).with_velocity(90.0, 250.0, 0.0);
        let b =
            FlightState::new("cnv002", 0.0, 2.0 / 60.0, 30_000.0).with_velocity(270.0, 250.0, 0.0);
        let close = model.predict(&a, &b);
        assert!(close.error.is_none());

        let c = FlightState::new("far001", 10.0, 10.0, 12_000.0).with_velocity(90.0, 250.0, 0.0);
        let d = FlightState::new("far002", 30.0, -40.0, 35_000.0).with_velocity(90.0, 250.0, 0.0);
        let far = model.predict(&c, &d);
        assert!(far.error.is_none());

        assert!(close.conflict_probability > far.conflict_probability);
        assert!(close.conflict_probability > 0.5);
        assert!(far.conflict_probability < 0.5);
    }

    #[test]
    fn untrained_model_reports_error_not_panic() {
        let model = ConflictRiskModel::new();
        let a = FlightState::new("unt001", 0.0, 0.0, 30_000.0);
        let b = FlightState::new("unt002", 0.0, 0.1, 30_000.0);
        let assessment = model.predict(&a, &b);
        assert!(assessment.error.is_some());
        assert_eq!(assessment.conflict_probability, 0.0);
        assert_eq!(assessment.confidence, 0.0);
    }

    #[test]
    fn malformed_input_reports_error_not_panic() {
        let model = trained_model();
        let a = FlightState::new("bad001", 0.0, 0.0, f64::NAN);
        let b = FlightState::new("bad002", 0.0, 0.1, 30_000.0);
        let assessment = model.predict(&a, &b);
        assert!(assessment.error.is_some());
        assert_eq!(assessment.conflict_probability, 0.0);
        assert_eq!(assessment.confidence, 0.0);
    }

    #[test]
    fn degenerate_dataset_is_rejected() {
        let mut model = ConflictRiskModel::new();
        assert!(matches!(
            model.train(&[]),
            Err(RiskModelError::TooFewSamples(0))
        ));

        let all_clear: Vec<LabeledEncounter> = (0..50)
            .map(|i| LabeledEncounter {
                features: EncounterFeatures {
                    horizontal_distance_nm: 40.0 + i as f64,
                    closing_speed_kt: -50.0,
                    altitude_difference_ft: 4000.0,
                    vertical_rate_difference_fpm: 0.0,
                    track_angle_difference_deg: 0.0,
                },
                conflict: false,
            })
            .collect();
        assert!(matches!(
            model.train(&all_clear),
            Err(RiskModelError::SingleClass)
        ));
        assert!(!model.is_trained());
    }

    #[test]
    fn head_on_pair_has_positive_closing_speed() {
        let a = FlightState::new("cls001", 0.0, 0.0, 30_000.0).with_velocity(90.0, 250.0, 0.0);
        let b =
            FlightState::new("cls002", 0.0, 10.0 / 60.0, 30_000.0).with_velocity(270.0, 250.0, 0.0);
        let features = EncounterFeatures::extract(&a, &b).unwrap();
        assert!((features.closing_speed_kt - 500.0).abs() < 5.0);

        // Diverging pair closes negatively.
        let c = FlightState::new("div001", 0.0, 0.0, 30_000.0).with_velocity(270.0, 250.0, 0.0);
        let d =
            FlightState::new("div002", 0.0, 10.0 / 60.0, 30_000.0).with_velocity(90.0, 250.0, 0.0);
        let features = EncounterFeatures::extract(&c, &d).unwrap();
        assert!(features.closing_speed_kt < 0.0);
    }
}
