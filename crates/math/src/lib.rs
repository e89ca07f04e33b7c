#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/sintra-rs/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod covariance;
pub use covariance::{
    CovarianceConfig, CovarianceKind, HacKernel, kernel_covariance, kernel_weights,
    moment_covariance, newey_west_bandwidth, robust_covariance,
};

mod linalg;
pub use linalg::{inv, kron, outer, pinv};

mod ordering;
pub use ordering::{intercept_slots, select_square, transpose_order, two_pass_order};

mod error;
pub use error::MathError;
