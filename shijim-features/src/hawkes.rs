//! Self-exciting (Hawkes) intensity with an exponential decay kernel,
//! grounded on `examples/original_source/shijim/features/hawkes.py` and
//! `examples/original_source/tests/features/test_rust_hawkes.py`.

use crate::error::FeatureError;

/// `μ + (λ_last − μ) · exp(−β·(t − t_last))` recursive intensity
/// estimator (Ogata's exponential-kernel recursion for a univariate
/// Hawkes process).
#[derive(Debug, Clone, Copy)]
pub struct HawkesIntensity {
    baseline: f64,
    alpha: f64,
    beta: f64,
    last: Option<(f64, f64)>,
}

impl HawkesIntensity {
    pub fn new(baseline: f64, alpha: f64, beta: f64) -> Self {
        Self { baseline, alpha, beta, last: None }
    }

    /// Register an event at time `t`, returning the post-jump intensity.
    /// `t` must be finite and not precede the last registered event.
    pub fn update(&mut self, t: f64) -> Result<f64, FeatureError> {
        self.check_time(t)?;

        let pre_jump = match self.last {
            Some((t_last, lambda_last)) => {
                self.baseline + (lambda_last - self.baseline) * (-self.beta * (t - t_last)).exp()
            }
            None => self.baseline,
        };
        let post_jump = pre_jump + self.alpha;
        self.last = Some((t, post_jump));
        Ok(post_jump)
    }

    /// Register a batch of events in order, returning each post-jump
    /// intensity.
    pub fn update_many(&mut self, times: &[f64]) -> Result<Vec<f64>, FeatureError> {
        times.iter().map(|&t| self.update(t)).collect()
    }

    /// Decayed intensity at `t` without registering a new event. `t` must
    /// not precede the last registered event.
    pub fn intensity_at(&self, t: f64) -> Result<f64, FeatureError> {
        self.check_time_against_last(t)?;
        Ok(match self.last {
            Some((t_last, lambda_last)) => self.baseline + (lambda_last - self.baseline) * (-self.beta * (t - t_last)).exp(),
            None => self.baseline,
        })
    }

    pub fn reset(&mut self) {
        self.last = None;
    }

    fn check_time(&self, t: f64) -> Result<(), FeatureError> {
        self.check_time_against_last(t)
    }

    fn check_time_against_last(&self, t: f64) -> Result<(), FeatureError> {
        if !t.is_finite() {
            return Err(FeatureError::NonFiniteTime(t));
        }
        if let Some((t_last, _)) = self.last {
            if t < t_last {
                return Err(FeatureError::TimeWentBackwards { t, last: t_last });
            }
        }
        Ok(())
    }
}
