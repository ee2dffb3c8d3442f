//! Optimization state for gradient-based training.
//!
//! - [`UpdateRule`]: serde-configurable step-size rule (SGD, Adagrad, RMSProp, Adam)
//! - [`ItemOptimizer`]: adaptive state kept per item, as used by SLIM-BPR
//!
//! ```
//! use recomendar::optim::{ItemOptimizer, UpdateRule};
//!
//! let mut optimizer = ItemOptimizer::new(UpdateRule::Adagrad, 0.1, 10);
//! let eta = optimizer.step(4, 0.5);
//! assert!(eta > 0.0 && eta <= 0.1 + 1e-6);
//! ```

mod stochastic;

pub use stochastic::{ItemOptimizer, UpdateRule};
