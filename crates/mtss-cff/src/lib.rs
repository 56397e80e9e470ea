//! # mtss-cff
//!
//! Cover-free family (CFF) test designs for the MTSS signature scheme.
//!
//! A d-CFF(t, n) is a set of t tests over n items such that no item's tests
//! are fully covered by the tests of any d other items. Applied to message
//! blocks, the pass/fail pattern of per-test signature checks uniquely
//! identifies up to d modified blocks.
//!
//! This crate provides:
//! - **CffDesign**: a validated test design with outcome decoding
//! - **Polynomial construction**: deterministic designs from (q, k) parameters
//! - **DesignRepository**: keyed storage of previously generated designs

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod design;
pub mod error;
pub mod polynomial;
pub mod store;

pub use design::{best_params_within, obtain, obtain_params, reconstruct, CffDesign, DesignParams};
pub use error::{CffError, Result};
pub use store::{DesignRepository, FsDesignRepository, MemoryDesignRepository};
