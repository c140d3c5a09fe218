pub mod classifier_trait;
pub mod factory;
pub mod generative;
pub mod logreg;
pub mod representation;

pub use classifier_trait::{NoiseAwareModel, RepresentationModel};
pub use generative::LfAccuracyModel;
pub use logreg::LogisticRegression;
pub use representation::FeaturizedModel;
