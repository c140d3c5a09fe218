use ndarray::Array1;

/// Numerically stable logistic function.
pub fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Map log-odds weights to probabilities, element-wise.
pub fn odds_to_prob(w: &Array1<f64>) -> Array1<f64> {
    w.mapv(sigmoid)
}

/// Sign of a vote total, with ties counted as a negative prediction.
#[inline]
pub fn sign_or_negative(v: f64) -> i32 {
    if v > 0.0 {
        1
    } else {
        -1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_sigmoid_is_symmetric_and_stable() {
        assert_abs_diff_eq!(sigmoid(0.0), 0.5);
        assert_abs_diff_eq!(sigmoid(2.0) + sigmoid(-2.0), 1.0, epsilon = 1e-12);
        assert!(sigmoid(-800.0).is_finite());
        assert!(sigmoid(800.0) <= 1.0);
    }

    #[test]
    fn test_sign_ties_are_negative() {
        assert_eq!(sign_or_negative(2.0), 1);
        assert_eq!(sign_or_negative(0.0), -1);
        assert_eq!(sign_or_negative(-0.5), -1);
    }
}
