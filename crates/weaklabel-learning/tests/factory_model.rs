use ndarray::Array1;
use sprs::TriMat;

use weaklabel_learning::config::{Hyperparams, ModelConfig, ModelType};
use weaklabel_learning::math::SparseMatrix;
use weaklabel_learning::models::factory;

/// Two indicator features and a trailing bias column.
fn design() -> SparseMatrix {
    let rows: [(usize, f64); 6] = [(0, 1.0), (1, 1.0), (0, 1.0), (1, 0.9), (0, 1.1), (1, 1.2)];
    let mut tri = TriMat::new((rows.len(), 3));
    for (i, &(j, v)) in rows.iter().enumerate() {
        tri.add_triplet(i, j, v);
        tri.add_triplet(i, 2, 1.0);
    }
    tri.to_csr()
}

#[test]
fn test_factory_builds_and_predicts() {
    let x = design();
    let marginals = Array1::from(vec![0.9, 0.1, 0.8, 0.2, 0.95, 0.05]);

    let params = ModelConfig::new(
        true,
        ModelType::LogReg {
            rate: 0.1,
            mu: 1e-6,
            alpha: 0.0,
            n_iter: 500,
            tol: 1e-8,
        },
    );
    let mut model = factory::build_model(&params);
    model
        .train(&x, &Array1::zeros(3), Some(&marginals), &Hyperparams::new())
        .unwrap();
    let probs = model.marginals(&x).unwrap();
    assert_eq!(probs.len(), x.rows());
    assert_eq!(
        model.predict(&x, 0.5).unwrap().to_vec(),
        vec![1, -1, 1, -1, 1, -1]
    );
}

#[test]
fn test_factory_generative_model_scores_votes() {
    // Two LFs that always agree.
    let mut tri = TriMat::new((4, 2));
    for (i, v) in [1.0, -1.0, 1.0, -1.0].into_iter().enumerate() {
        tri.add_triplet(i, 0, v);
        tri.add_triplet(i, 1, v);
    }
    let l: SparseMatrix = tri.to_csr();

    let mut model = factory::build_model(&ModelConfig::new(false, ModelType::lf_accuracy()));
    model
        .train(&l, &Array1::from_elem(2, 1.0), None, &Hyperparams::new())
        .unwrap();
    assert_eq!(model.weights().unwrap().len(), 2);
    assert_eq!(model.predict(&l, 0.5).unwrap().to_vec(), vec![1, -1, 1, -1]);
}
