#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/sintra-rs/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod traded;
pub use traded::{TradedConfig, TradedFactorModel};

mod cross_section;
pub use cross_section::{CrossSectionConfig, LinearFactorModel};

mod gmm;
pub use gmm::{GmmConfig, GmmFactorModel};

mod results;
pub use results::FactorModelResults;

mod data;
pub use data::{panel_from_frame, wide_panel};

mod moments;

mod error;
pub use error::ModelError;

/// Re-export commonly used types.
pub mod prelude {
    pub use sintra_math::{CovarianceConfig, CovarianceKind, HacKernel};
    pub use sintra_primitives::{ReturnPanel, WaldTestStatistic};

    pub use super::{
        CrossSectionConfig, FactorModelResults, GmmConfig, GmmFactorModel, LinearFactorModel,
        ModelError, TradedConfig, TradedFactorModel, panel_from_frame, wide_panel,
    };
}
