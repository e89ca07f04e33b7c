//! # sintra
//!
//! Linear asset-pricing factor model estimation.
//!
//! This crate provides a unified interface to the sintra estimator ecosystem.
//! Individual components can be enabled via feature flags.
//!
//! ## Features
//!
//! - `full` (default): Enables all components
//! - `primitives`: Return panels and test statistics
//! - `math`: Covariance kernels and dense linear algebra
//! - `model`: Factor-model estimators
//!
//! ## Example
//!
//! ```rust,ignore
//! // With default features (all components):
//! use sintra::model;
//! use sintra::primitives;
//!
//! // Or with specific features only:
//! // [dependencies]
//! // sintra = { version = "0.1", default-features = false, features = ["model"] }
//! ```

#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

#[cfg(feature = "primitives")]
#[doc(inline)]
pub use sintra_primitives as primitives;
#[cfg(feature = "math")]
#[doc(inline)]
pub use sintra_math as math;
#[cfg(feature = "model")]
#[doc(inline)]
pub use sintra_model as model;
