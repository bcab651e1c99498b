//! pyprune - Python unused-import analyzer with safe removal edit planning
//!
//! This crate analyzes Python source files to determine which imported
//! names are actually referenced, and plans minimal, syntax-preserving
//! edits that remove exactly the unused import bindings.

pub mod analysis;
pub mod edit;
pub mod export;
pub mod parser;
