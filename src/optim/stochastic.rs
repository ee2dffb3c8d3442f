//! Per-item adaptive step sizes for sparse stochastic gradient ascent.
//!
//! SLIM-BPR touches only a handful of columns per sample, so the adaptive
//! state is kept per item rather than per parameter: every update of item
//! `i` reads and advances `cache[i]` (and `moment[i]` for Adam).
//!
//! # Update Rules
//!
//! ```text
//! Sgd:      η(g) = lr · g
//! Adagrad:  c_i += g²;                      η(g) = lr · g / (√c_i + ε)
//! RmsProp:  c_i = ρ·c_i + (1-ρ)·g²;         η(g) = lr · g / (√c_i + ε)
//! Adam:     m_i = β₁·m_i + (1-β₁)·g
//!           c_i = β₂·c_i + (1-β₂)·g²
//!           η(g) = lr · m̂_i / (√ĉ_i + ε)   (bias-corrected with t_i)
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{RecomendarError, Result};

const EPSILON: f32 = 1e-8;

/// Step-size rule applied to every gradient before it reaches the weights.
///
/// # Example
///
/// ```
/// use recomendar::optim::UpdateRule;
///
/// let rule: UpdateRule = serde_json::from_str(r#"{"type": "rms_prop", "decay": 0.9}"#).unwrap();
/// assert_eq!(rule, UpdateRule::RmsProp { decay: 0.9 });
/// assert_eq!(UpdateRule::default(), UpdateRule::Adagrad);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UpdateRule {
    /// Plain stochastic gradient step
    Sgd,
    /// Accumulated squared gradients
    #[default]
    Adagrad,
    /// Exponentially decayed squared gradients
    RmsProp {
        /// Decay of the squared-gradient cache
        decay: f32,
    },
    /// First and second moment estimates with bias correction
    Adam {
        /// Decay of the first moment
        beta1: f32,
        /// Decay of the second moment
        beta2: f32,
    },
}

impl UpdateRule {
    /// RMSProp with decay 0.995.
    #[must_use]
    pub fn rms_prop() -> Self {
        Self::RmsProp { decay: 0.995 }
    }

    /// Adam with β₁ = 0.9, β₂ = 0.999.
    #[must_use]
    pub fn adam() -> Self {
        Self::Adam {
            beta1: 0.9,
            beta2: 0.999,
        }
    }

    /// # Errors
    ///
    /// Returns [`RecomendarError::InvalidHyperparameter`] if a decay rate is
    /// outside `[0, 1)`.
    pub fn validate(&self) -> Result<()> {
        let check = |name: &str, v: f32| {
            if (0.0..1.0).contains(&v) {
                Ok(())
            } else {
                Err(RecomendarError::invalid(name, v, "in [0, 1)"))
            }
        };
        match *self {
            Self::Sgd | Self::Adagrad => Ok(()),
            Self::RmsProp { decay } => check("rms_prop.decay", decay),
            Self::Adam { beta1, beta2 } => {
                check("adam.beta1", beta1)?;
                check("adam.beta2", beta2)
            }
        }
    }
}

/// Adaptive optimizer state for `n_items` independent step-size schedules.
///
/// Unlike a parameter-vector optimizer, `step` returns the scaled increment
/// and leaves applying it to the caller, which writes it into many weights.
///
/// # Example
///
/// ```
/// use recomendar::optim::{ItemOptimizer, UpdateRule};
///
/// let mut opt = ItemOptimizer::new(UpdateRule::Sgd, 0.1, 3);
/// assert!((opt.step(0, 0.5) - 0.05).abs() < 1e-7);
///
/// let mut ada = ItemOptimizer::new(UpdateRule::Adagrad, 0.1, 3);
/// let first = ada.step(1, 1.0);
/// let second = ada.step(1, 1.0);
/// assert!(second < first);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemOptimizer {
    rule: UpdateRule,
    learning_rate: f32,
    /// Squared-gradient accumulator (Adagrad, RMSProp, Adam second moment)
    cache: Vec<f32>,
    /// First moment (Adam only)
    moment: Vec<f32>,
    /// Updates seen per item, for Adam bias correction
    steps: Vec<u32>,
}

impl ItemOptimizer {
    /// Creates zeroed state for `n_items` items.
    #[must_use]
    pub fn new(rule: UpdateRule, learning_rate: f32, n_items: usize) -> Self {
        let adam = matches!(rule, UpdateRule::Adam { .. });
        Self {
            rule,
            learning_rate,
            cache: match rule {
                UpdateRule::Sgd => Vec::new(),
                _ => vec![0.0; n_items],
            },
            moment: if adam { vec![0.0; n_items] } else { Vec::new() },
            steps: if adam { vec![0; n_items] } else { Vec::new() },
        }
    }

    #[must_use]
    pub fn rule(&self) -> UpdateRule {
        self.rule
    }

    #[must_use]
    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    /// Advances item `item`'s state with `gradient` and returns `η(gradient)`.
    ///
    /// # Panics
    ///
    /// Panics if `item` is out of range for an adaptive rule.
    pub fn step(&mut self, item: usize, gradient: f32) -> f32 {
        match self.rule {
            UpdateRule::Sgd => self.learning_rate * gradient,
            UpdateRule::Adagrad => {
                self.cache[item] += gradient * gradient;
                self.learning_rate * gradient / (self.cache[item].sqrt() + EPSILON)
            }
            UpdateRule::RmsProp { decay } => {
                let c = &mut self.cache[item];
                *c = decay * *c + (1.0 - decay) * gradient * gradient;
                self.learning_rate * gradient / (c.sqrt() + EPSILON)
            }
            UpdateRule::Adam { beta1, beta2 } => {
                self.steps[item] = self.steps[item].saturating_add(1);
                let t = self.steps[item] as i32;

                let m = &mut self.moment[item];
                *m = beta1 * *m + (1.0 - beta1) * gradient;
                let m_hat = *m / (1.0 - beta1.powi(t));

                let v = &mut self.cache[item];
                *v = beta2 * *v + (1.0 - beta2) * gradient * gradient;
                let v_hat = *v / (1.0 - beta2.powi(t));

                self.learning_rate * m_hat / (v_hat.sqrt() + EPSILON)
            }
        }
    }

    /// Zeroes all accumulated state.
    pub fn reset(&mut self) {
        self.cache.fill(0.0);
        self.moment.fill(0.0);
        self.steps.fill(0);
    }
}

#[cfg(test)]
#[path = "stochastic_tests.rs"]
mod tests;
