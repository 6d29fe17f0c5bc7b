//! The reagent agent: a ReAct loop over a model gateway and tool dispatch.
//!
//! [`ReactOrchestrator`] owns the loop. [`system_prompt`] renders the base
//! instructions the loop starts each task with.

pub mod orchestrator;
pub mod prompt;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use orchestrator::{DEFAULT_ANSWER, ReactOrchestrator, TaskOutcome, render_action};
pub use prompt::system_prompt;
