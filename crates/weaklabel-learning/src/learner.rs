//! Training orchestration over a shared [`TrainingSet`].
//!
//! A [`Learner`] pairs a training set with a [`Strategy`] and drives
//! train / test cycles. The test-set transformation (label matrix and design
//! matrix of the test candidates) is cached until a different candidate set or
//! gold vector is tested, so repeated evaluation during a hyperparameter sweep
//! never re-applies the labeling functions or the featurizer.
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use ndarray::{s, Array1};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::{Hyperparams, LearnerConfig, StrategyKind, CLASS_BALANCE, FEAT_W0, LF_W0};
use crate::design::{balance_marginals, feature_design, joint_design, WeightLayout};
use crate::error::{LearnError, Result};
use crate::featurize::Featurizer;
use crate::label_matrix::LabelMatrix;
use crate::math::{mat_vec, odds_to_prob, row_sums, sign_or_negative, to_f64, SparseMatrix};
use crate::models::factory::{build_logreg, build_model};
use crate::models::{FeaturizedModel, NoiseAwareModel, RepresentationModel};
use crate::scoring::{test_scores, validate_gold, Scores};
use crate::training_set::TrainingSet;

/// Seed used for class balancing unless [`Learner::with_seed`] overrides it.
pub const DEFAULT_SEED: u64 = 42;

/// Default initial weight of the generative model's LF columns.
const GENERATIVE_LF_W0: f64 = 1.0;

/// Default initial weight of the LF columns in joint mode. Logistic
/// regression self-labels from `sign(X . w0)`, so a zero start learns nothing.
pub const JOINT_LF_W0: f64 = 1.0;

/// How votes, features and models are combined. Each variant holds exactly
/// the models it trains.
pub enum Strategy<C> {
    /// One model over `[L | F | bias]`.
    Joint { model: Box<dyn NoiseAwareModel> },
    /// Generative model over `L`, then a discriminative model over
    /// `[F | bias]` trained on the generative marginals.
    Pipelined {
        generative: Box<dyn NoiseAwareModel>,
        discriminative: Box<dyn NoiseAwareModel>,
    },
    /// Generative model over `L`, then a model that consumes raw candidates.
    Representation {
        generative: Box<dyn NoiseAwareModel>,
        discriminative: Box<dyn RepresentationModel<C>>,
    },
}

impl<C: 'static> Strategy<C> {
    /// Build the models named in `config`.
    ///
    /// The representation strategy wraps `featurizer` around a logistic
    /// regression; the other strategies ignore it and use the training set's
    /// own featurizer instead.
    pub fn from_config(
        config: &LearnerConfig,
        featurizer: Option<Box<dyn Featurizer<C>>>,
    ) -> Result<Self> {
        Ok(match config.strategy {
            StrategyKind::Joint => Strategy::Joint {
                model: build_model(&config.discriminative),
            },
            StrategyKind::Pipelined => Strategy::Pipelined {
                generative: build_model(&config.generative),
                discriminative: build_model(&config.discriminative),
            },
            StrategyKind::Representation => {
                let featurizer =
                    featurizer.ok_or(LearnError::MissingCapability("representation featurizer"))?;
                Strategy::Representation {
                    generative: build_model(&config.generative),
                    discriminative: Box::new(FeaturizedModel::new(
                        featurizer,
                        build_logreg(&config.discriminative),
                    )),
                }
            }
        })
    }
}

impl<C> Strategy<C> {
    pub fn kind(&self) -> StrategyKind {
        match self {
            Strategy::Joint { .. } => StrategyKind::Joint,
            Strategy::Pipelined { .. } => StrategyKind::Pipelined,
            Strategy::Representation { .. } => StrategyKind::Representation,
        }
    }
}

/// Weights of every model held by a learner, in strategy order, and the
/// training marginals they were fit with.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSnapshot {
    weights: Vec<Option<Array1<f64>>>,
    marginals: Option<Array1<f64>>,
}

impl ModelSnapshot {
    pub fn weights(&self) -> &[Option<Array1<f64>>] {
        &self.weights
    }

    pub fn marginals(&self) -> Option<&Array1<f64>> {
        self.marginals.as_ref()
    }
}

/// A feature and its learned weight.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureWeight {
    pub index: usize,
    pub name: String,
    pub weight: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CacheKey {
    fingerprint: u64,
    n_candidates: usize,
    gold: u64,
}

impl CacheKey {
    fn of<C: Hash>(candidates: &[C], gold: &[i32]) -> Self {
        CacheKey {
            fingerprint: hash_of(candidates),
            n_candidates: candidates.len(),
            gold: hash_of(gold),
        }
    }
}

fn hash_of<T: Hash + ?Sized>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Cached transformation of the last test set. `l` and `x` are filled lazily
/// because majority vote never needs `x` and representation testing needs
/// neither.
struct TestCache<C> {
    key: CacheKey,
    candidates: Vec<C>,
    l: Option<LabelMatrix>,
    x: Option<SparseMatrix>,
}

pub struct Learner<C> {
    training_set: Rc<TrainingSet<C>>,
    strategy: Strategy<C>,
    rng: StdRng,
    train_marginals: Option<Array1<f64>>,
    cache: Option<TestCache<C>>,
}

impl<C: Clone + Hash + Eq> Learner<C> {
    /// Wrap a training set and a strategy.
    ///
    /// # Arguments
    ///
    /// * `training_set` - Shared training candidates and their matrices
    /// * `strategy` - The models to train and how to combine them
    ///
    /// # Returns
    ///
    /// `MissingCapability("featurizer")` when the joint or pipelined strategy
    /// is paired with a training set that has no feature matrix.
    pub fn new(training_set: Rc<TrainingSet<C>>, strategy: Strategy<C>) -> Result<Self> {
        match strategy.kind() {
            StrategyKind::Joint | StrategyKind::Pipelined if !training_set.has_featurizer() => {
                return Err(LearnError::MissingCapability("featurizer"));
            }
            _ => {}
        }
        Ok(Learner {
            training_set,
            strategy,
            rng: StdRng::seed_from_u64(DEFAULT_SEED),
            train_marginals: None,
            cache: None,
        })
    }

    /// Reseed the class-balancing random source.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn strategy_kind(&self) -> StrategyKind {
        self.strategy.kind()
    }

    pub fn training_set(&self) -> &TrainingSet<C> {
        &self.training_set
    }

    /// Column layout of the joint model's weights; `None` for the two-stage
    /// strategies, whose models keep separate weight vectors.
    pub fn joint_layout(&self) -> Option<WeightLayout> {
        match &self.strategy {
            Strategy::Joint { model } => Some(WeightLayout::new(
                self.training_set.n_lfs(),
                self.training_set.n_features(),
                model.bias_term(),
            )),
            _ => None,
        }
    }

    /// Fit the strategy's models on the training set.
    ///
    /// Reads `lf_w0`, `feat_w0` and `class_balance` from `hyperparams` and
    /// forwards every entry to the models.
    pub fn train(&mut self, hyperparams: &Hyperparams) -> Result<()> {
        let ts = Rc::clone(&self.training_set);
        log::info!(
            "Training {:?} learner on {} candidates",
            self.strategy.kind(),
            ts.n_candidates()
        );
        let marginals = match &mut self.strategy {
            Strategy::Joint { model } => {
                let f = ts.f().ok_or(LearnError::MissingCapability("featurizer"))?;
                let x = joint_design(ts.l(), f, model.bias_term())?;
                let layout = WeightLayout::new(ts.n_lfs(), f.cols(), model.bias_term());
                let w0 = layout.initial_weights(
                    hyperparams.get_or(LF_W0, JOINT_LF_W0),
                    hyperparams.get_or(FEAT_W0, 0.0),
                );
                log::debug!("Joint design matrix: {} x {}", x.rows(), x.cols());
                model.train(&x, &w0, None, hyperparams)?;
                model.marginals(&x)?
            }
            Strategy::Pipelined {
                generative,
                discriminative,
            } => {
                let marginals = fit_generative(generative.as_mut(), ts.l(), hyperparams, &mut self.rng)?;
                let f = ts.f().ok_or(LearnError::MissingCapability("featurizer"))?;
                let x = feature_design(f, discriminative.bias_term())?;
                let w0 = WeightLayout::new(0, f.cols(), discriminative.bias_term())
                    .initial_weights(0.0, hyperparams.get_or(FEAT_W0, 0.0));
                log::info!("Training discriminative model on {} x {}", x.rows(), x.cols());
                discriminative.train(&x, &w0, Some(&marginals), hyperparams)?;
                marginals
            }
            Strategy::Representation {
                generative,
                discriminative,
            } => {
                let marginals = fit_generative(generative.as_mut(), ts.l(), hyperparams, &mut self.rng)?;
                log::info!("Training representation model '{}'", discriminative.name());
                discriminative.train(ts.candidates(), &marginals, hyperparams)?;
                marginals
            }
        };

        self.train_marginals = Some(marginals);
        log::info!("Training done");
        Ok(())
    }

    /// Marginals the end model was trained on: the (possibly class-balanced)
    /// generative marginals in the two-stage strategies, the joint model's own
    /// marginals on `X` in joint mode.
    pub fn training_marginals(&self) -> Option<&Array1<f64>> {
        self.train_marginals.as_ref()
    }

    /// Drop the cached test-set transformation.
    pub fn invalidate_test_cache(&mut self) {
        self.cache = None;
    }

    fn check_test_inputs(candidates: &[C], gold: &[i32]) -> Result<()> {
        if candidates.len() != gold.len() {
            return Err(LearnError::shape("test (gold length)", candidates.len(), gold.len()));
        }
        validate_gold(gold)
    }

    /// Point the cache at `candidates`, discarding it if they differ from the
    /// last tested set.
    fn prepare_cache(&mut self, candidates: &[C], gold: &[i32]) {
        let key = CacheKey::of(candidates, gold);
        let hit = self
            .cache
            .as_ref()
            .is_some_and(|c| c.key == key && c.candidates == candidates);
        if hit {
            log::debug!("Reusing cached test transformation ({} candidates)", candidates.len());
        } else {
            log::debug!("New test set: {} candidates", candidates.len());
            self.cache = Some(TestCache {
                key,
                candidates: candidates.to_vec(),
                l: None,
                x: None,
            });
        }
    }

    fn cache_mut(&mut self) -> Result<&mut TestCache<C>> {
        self.cache
            .as_mut()
            .ok_or(LearnError::NotTrained("test set transformation"))
    }

    fn ensure_label_matrix(&mut self) -> Result<()> {
        let ts = Rc::clone(&self.training_set);
        let cache = self.cache_mut()?;
        if cache.l.is_none() {
            cache.l = Some(ts.label_matrix(&cache.candidates)?);
        }
        Ok(())
    }

    fn ensure_design(&mut self) -> Result<()> {
        let bias = match &self.strategy {
            Strategy::Joint { model } => model.bias_term(),
            Strategy::Pipelined { discriminative, .. } => discriminative.bias_term(),
            Strategy::Representation { .. } => return Ok(()),
        };
        let joint = self.strategy.kind() == StrategyKind::Joint;
        if joint {
            self.ensure_label_matrix()?;
        }

        let ts = Rc::clone(&self.training_set);
        let cache = self.cache_mut()?;
        if cache.x.is_some() {
            return Ok(());
        }
        let f = ts.features(&cache.candidates)?;
        let x = match (&cache.l, joint) {
            (Some(l), true) => joint_design(l, &f, bias)?,
            _ => feature_design(&f, bias)?,
        };
        log::debug!("Test design matrix: {} x {}", x.rows(), x.cols());
        cache.x = Some(x);
        Ok(())
    }

    /// Predictions for the cached test set.
    pub fn predictions(&mut self, threshold: f64) -> Result<Array1<i32>> {
        self.ensure_design()?;
        let cache = self
            .cache
            .as_ref()
            .ok_or(LearnError::NotTrained("test set transformation"))?;
        match &self.strategy {
            Strategy::Joint { model } => model.predict(design(cache)?, threshold),
            Strategy::Pipelined { discriminative, .. } => {
                discriminative.predict(design(cache)?, threshold)
            }
            Strategy::Representation { discriminative, .. } => {
                discriminative.predict(&cache.candidates, threshold)
            }
        }
    }

    /// Score the trained model on `candidates`.
    ///
    /// # Arguments
    ///
    /// * `candidates` - Test candidates, in the same order as `gold`
    /// * `gold` - Gold labels in {-1, 1}
    /// * `threshold` - Marginal above which a candidate is predicted positive
    pub fn test(&mut self, candidates: &[C], gold: &[i32], threshold: f64) -> Result<Scores> {
        Self::check_test_inputs(candidates, gold)?;
        self.prepare_cache(candidates, gold);
        let pred = self.predictions(threshold)?;
        test_scores(&pred.to_vec(), gold)
    }

    /// Unweighted majority vote of the labeling functions; ties are negative.
    pub fn test_mv(&mut self, candidates: &[C], gold: &[i32]) -> Result<Scores> {
        Self::check_test_inputs(candidates, gold)?;
        self.prepare_cache(candidates, gold);
        self.ensure_label_matrix()?;
        let l = self.cached_label_matrix()?;
        let pred: Vec<i32> = row_sums(l).into_iter().map(sign_or_negative).collect();
        test_scores(&pred, gold)
    }

    /// Majority vote weighted by the learned LF weights; ties are negative.
    pub fn test_wmv(&mut self, candidates: &[C], gold: &[i32]) -> Result<Scores> {
        Self::check_test_inputs(candidates, gold)?;
        let w = self.lf_weights()?;
        self.prepare_cache(candidates, gold);
        self.ensure_label_matrix()?;
        let l = self.cached_label_matrix()?;
        let pred: Vec<i32> = mat_vec(&to_f64(l), &w)?
            .iter()
            .map(|&v| sign_or_negative(v))
            .collect();
        test_scores(&pred, gold)
    }

    fn cached_label_matrix(&self) -> Result<&LabelMatrix> {
        self.cache
            .as_ref()
            .and_then(|c| c.l.as_ref())
            .ok_or(LearnError::NotTrained("test label matrix"))
    }

    /// Learned LF weights (log-odds of each LF being correct).
    pub fn lf_weights(&self) -> Result<Array1<f64>> {
        match &self.strategy {
            Strategy::Joint { model } => {
                let w = model.weights().ok_or(LearnError::NotTrained("LF weights"))?;
                let layout = self.joint_layout().ok_or(LearnError::NotTrained("LF weights"))?;
                Ok(layout.lf_segment(w)?.to_owned())
            }
            Strategy::Pipelined { generative, .. } | Strategy::Representation { generative, .. } => {
                generative
                    .weights()
                    .cloned()
                    .ok_or(LearnError::NotTrained("LF weights"))
            }
        }
    }

    /// Estimated LF accuracies, `sigmoid(lf_weights)`.
    pub fn lf_accs(&self) -> Result<Array1<f64>> {
        Ok(odds_to_prob(&self.lf_weights()?))
    }

    /// End-model weights of the feature columns, bias excluded.
    pub fn feature_weights(&self) -> Result<Array1<f64>> {
        let (w, bias) = self.end_weights()?;
        match self.joint_layout() {
            Some(layout) => Ok(layout.feature_segment(w)?.to_owned()),
            None => {
                let n = w.len() - usize::from(bias);
                Ok(w.slice(s![..n]).to_owned())
            }
        }
    }

    /// The end model's intercept, `None` without a bias column.
    pub fn bias(&self) -> Result<Option<f64>> {
        let (w, bias) = self.end_weights()?;
        match self.joint_layout() {
            Some(layout) => layout.bias(w),
            None => Ok(bias.then(|| w[w.len() - 1])),
        }
    }

    fn end_weights(&self) -> Result<(&Array1<f64>, bool)> {
        let (w, bias) = match &self.strategy {
            Strategy::Joint { model } => (model.weights(), model.bias_term()),
            Strategy::Pipelined { discriminative, .. } => {
                (discriminative.weights(), discriminative.bias_term())
            }
            Strategy::Representation { discriminative, .. } => {
                (discriminative.weights(), discriminative.bias_term())
            }
        };
        let w = w.ok_or(LearnError::NotTrained("feature weights"))?;
        if bias && w.is_empty() {
            return Err(LearnError::shape("end model weights (bias)", 1, 0));
        }
        Ok((w, bias))
    }

    /// The `n_max` features with the largest absolute weight, strongest first.
    pub fn feature_stats(&self, n_max: usize) -> Result<Vec<FeatureWeight>> {
        let w = self.feature_weights()?;
        let mut order: Vec<usize> = (0..w.len()).collect();
        order.sort_by(|&a, &b| w[b].abs().total_cmp(&w[a].abs()).then(a.cmp(&b)));

        Ok(order
            .into_iter()
            .take(n_max)
            .map(|index| FeatureWeight {
                index,
                name: self
                    .feature_name(index)
                    .map_or_else(|| format!("feature_{}", index), str::to_string),
                weight: w[index],
            })
            .collect())
    }

    fn feature_name(&self, index: usize) -> Option<&str> {
        match &self.strategy {
            Strategy::Representation { discriminative, .. } => discriminative.feature_name(index),
            _ => self
                .training_set
                .featurizer()
                .and_then(|f| f.feature_name(index)),
        }
    }

    /// Copy every model's current weights and the training marginals.
    pub fn snapshot(&self) -> ModelSnapshot {
        let weights = match &self.strategy {
            Strategy::Joint { model } => vec![model.weights().cloned()],
            Strategy::Pipelined {
                generative,
                discriminative,
            } => vec![generative.weights().cloned(), discriminative.weights().cloned()],
            Strategy::Representation {
                generative,
                discriminative,
            } => vec![generative.weights().cloned(), discriminative.weights().cloned()],
        };
        ModelSnapshot {
            weights,
            marginals: self.train_marginals.clone(),
        }
    }

    /// Reinstate weights and training marginals captured by
    /// [`Learner::snapshot`]. Models that were untrained at snapshot time keep
    /// their current weights.
    pub fn restore(&mut self, snapshot: &ModelSnapshot) -> Result<()> {
        let n_models = match self.strategy {
            Strategy::Joint { .. } => 1,
            _ => 2,
        };
        if snapshot.weights.len() != n_models {
            return Err(LearnError::shape(
                "restore (models in snapshot)",
                n_models,
                snapshot.weights.len(),
            ));
        }
        let mut weights = snapshot.weights.iter().cloned();
        let mut next = || weights.next().flatten();
        match &mut self.strategy {
            Strategy::Joint { model } => {
                if let Some(w) = next() {
                    model.set_weights(w);
                }
            }
            Strategy::Pipelined {
                generative,
                discriminative,
            } => {
                if let Some(w) = next() {
                    generative.set_weights(w);
                }
                if let Some(w) = next() {
                    discriminative.set_weights(w);
                }
            }
            Strategy::Representation {
                generative,
                discriminative,
            } => {
                if let Some(w) = next() {
                    generative.set_weights(w);
                }
                if let Some(w) = next() {
                    discriminative.set_weights(w);
                }
            }
        }
        if let Some(m) = &snapshot.marginals {
            self.train_marginals = Some(m.clone());
        }
        Ok(())
    }
}

impl<C: Clone + Hash + Eq + 'static> Learner<C> {
    /// Build the strategy from `config` and seed the learner with
    /// `config.seed`.
    pub fn from_config(
        training_set: Rc<TrainingSet<C>>,
        config: &LearnerConfig,
        representation_featurizer: Option<Box<dyn Featurizer<C>>>,
    ) -> Result<Self> {
        let strategy = Strategy::from_config(config, representation_featurizer)?;
        Ok(Learner::new(training_set, strategy)?.with_seed(config.seed))
    }
}

fn design<C>(cache: &TestCache<C>) -> Result<&SparseMatrix> {
    cache
        .x
        .as_ref()
        .ok_or(LearnError::NotTrained("test design matrix"))
}

/// Stage one of the two-stage strategies: fit the generative model on `L`
/// and return (optionally class-balanced) training marginals.
fn fit_generative(
    generative: &mut dyn NoiseAwareModel,
    l: &LabelMatrix,
    hyperparams: &Hyperparams,
    rng: &mut StdRng,
) -> Result<Array1<f64>> {
    let x = to_f64(l);
    let w0 = Array1::from_elem(x.cols(), hyperparams.get_or(LF_W0, GENERATIVE_LF_W0));
    log::info!(
        "Training generative model '{}' on {} x {} label matrix",
        generative.name(),
        x.rows(),
        x.cols()
    );
    generative.train(&x, &w0, None, hyperparams)?;
    let mut marginals = generative.marginals(&x)?;
    if hyperparams.flag(CLASS_BALANCE) {
        balance_marginals(&mut marginals, rng);
    }
    Ok(marginals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;
    use crate::featurize::FeatureSetFeaturizer;
    use crate::label_matrix::LabelingFunction;
    use crate::models::{LfAccuracyModel, LogisticRegression};

    fn lfs() -> Vec<LabelingFunction<u32>> {
        vec![
            LabelingFunction::new("lf_small", |&c: &u32| if c < 10 { 1 } else { 0 }),
            LabelingFunction::new("lf_large", |&c: &u32| if c >= 10 { -1 } else { 0 }),
        ]
    }

    fn training_set(featurized: bool) -> Rc<TrainingSet<u32>> {
        let featurizer: Option<Box<dyn Featurizer<u32>>> = if featurized {
            Some(Box::new(FeatureSetFeaturizer::new(|&c: &u32| {
                vec![format!("bucket={}", c / 10)]
            })))
        } else {
            None
        };
        Rc::new(TrainingSet::new((0..20).collect(), lfs(), featurizer).unwrap())
    }

    fn pipelined() -> Strategy<u32> {
        Strategy::Pipelined {
            generative: Box::new(LfAccuracyModel::new()),
            discriminative: Box::new(LogisticRegression::new(true)),
        }
    }

    #[test]
    fn test_two_stage_strategies_need_features() {
        let err = Learner::new(training_set(false), pipelined()).err().unwrap();
        assert!(matches!(err, LearnError::MissingCapability("featurizer")));

        let joint = Strategy::Joint {
            model: Box::new(LogisticRegression::new(false)),
        };
        assert!(Learner::new(training_set(false), joint).is_err());
    }

    #[test]
    fn test_accessors_before_training() {
        let learner = Learner::new(training_set(true), pipelined()).unwrap();
        assert!(matches!(learner.lf_weights(), Err(LearnError::NotTrained(_))));
        assert!(learner.training_marginals().is_none());
        assert!(learner.joint_layout().is_none());
    }

    #[test]
    fn test_joint_layout_tracks_bias() {
        let joint = Strategy::Joint {
            model: Box::new(LogisticRegression::new(true)),
        };
        let learner = Learner::new(training_set(true), joint).unwrap();
        let layout = learner.joint_layout().unwrap();
        assert_eq!(layout, WeightLayout::new(2, 2, true));
    }

    #[test]
    fn test_representation_config_needs_featurizer() {
        let config = LearnerConfig {
            strategy: StrategyKind::Representation,
            ..LearnerConfig::default()
        };
        assert!(matches!(
            Strategy::<u32>::from_config(&config, None).err().unwrap(),
            LearnError::MissingCapability(_)
        ));
        let config = LearnerConfig {
            strategy: StrategyKind::Joint,
            discriminative: ModelConfig::default(),
            ..LearnerConfig::default()
        };
        assert_eq!(
            Strategy::<u32>::from_config(&config, None).unwrap().kind(),
            StrategyKind::Joint
        );
    }

    #[test]
    fn test_restore_rejects_foreign_snapshot() {
        let mut learner = Learner::new(training_set(true), pipelined()).unwrap();
        let joint = Learner::new(
            training_set(true),
            Strategy::Joint {
                model: Box::new(LogisticRegression::new(false)),
            },
        )
        .unwrap();
        assert!(learner.restore(&joint.snapshot()).is_err());
    }
}
