//! CLI library components for the CRF metadata engine.

#![allow(missing_docs)]

pub mod logging;
pub mod session;
