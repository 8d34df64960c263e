//! Whole-program static analysis for object-oriented programs.
//!
//! - [`dataflow`]: monotone dataflow framework with work-list and iterative solvers,
//!   plus constant propagation and live variable analysis.
//! - [`callgraph`]: call graph and class hierarchy analysis.
//! - [`pointer_analysis`]: context-insensitive Andersen pointer analysis with an
//!   on-the-fly call graph.
//! - [`detector`]: client analyses built on top, e.g. dead code detection.

pub mod callgraph;
pub mod cfg;
pub mod config;
pub mod dataflow;
pub mod detector;
pub mod error;
pub mod ir;
pub mod pointer_analysis;
pub mod util;

pub use error::{AnalysisError, Result};
