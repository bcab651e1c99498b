//! Edit planning and application for pyprune.
//!
//! The planner turns the unused bindings of an analysis run into an ordered
//! removal plan; the applier rewrites source text from it. Callers that
//! apply fixes themselves only need the plan.
//!
//! # Example
//!
//! ```ignore
//! use pyprune::analysis::analyze;
//! use pyprune::edit::apply_edits;
//!
//! let source = "import os\nimport sys\nprint(sys.argv)\n";
//! let analysis = analyze(source)?;
//! if let Some(plan) = analysis.edit_plan {
//!     let cleaned = apply_edits(source, &plan);
//!     assert_eq!(cleaned, "import sys\nprint(sys.argv)\n");
//! }
//! ```

pub mod apply;
pub mod plan;

// Re-export commonly used types for convenience
pub use apply::apply_edits;
pub use plan::{plan_edits, EditAction, EditPlan, EditWarning, PlannedEdit};
