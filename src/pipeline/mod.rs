//! Dialogue budgeting and index-remapping pipeline.
//!
//! Raw turns go through the budget planner (none, compress, or segment), the
//! prompt assembler, and after the provider call the reconciler, which maps
//! the model's relative user indices back onto absolute ordinals through a
//! single [`UserIndexMap`]. The question navigator in [`fallback`] produces a
//! result whenever any of that fails.

pub mod budget;
pub mod compress;
pub mod fallback;
pub mod index_map;
pub mod prompt;
pub mod reconcile;
pub mod render;
mod repair;
pub mod segment;
pub mod topic;

pub use budget::{plan, BudgetPlan, BudgetSettings, Strategy};
pub use fallback::question_navigator;
pub use index_map::UserIndexMap;
pub use prompt::{assemble, PromptPair};
pub use reconcile::reconcile;
pub use topic::{AnalysisOutcome, TopicNode};
