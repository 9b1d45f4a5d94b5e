//! Built-in spam heuristics.
//!
//! Currently provides [`CjkSubjectClassifier`], the default heuristic that
//! flags subjects written with CJK unified ideographs.

pub mod cjk_subject;

pub use cjk_subject::*;
