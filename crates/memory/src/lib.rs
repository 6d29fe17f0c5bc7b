//! Episodic task memory for reagent.
//!
//! Finished runs are kept newest first in a capped log, recalled by
//! Jaccard similarity over task text and rendered into the system prompt.

pub mod file_backend;
pub mod format;
pub mod in_memory;
pub mod log;
pub mod similarity;

pub use file_backend::FileStore;
pub use format::format_for_prompt;
pub use in_memory::InMemoryStore;
pub use log::{DEFAULT_CAPACITY, DEFAULT_SIMILARITY_THRESHOLD, EpisodeLog};
pub use similarity::{jaccard_similarity, token_set, tokenize};
