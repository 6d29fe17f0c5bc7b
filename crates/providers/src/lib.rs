//! Chat-completion providers and the model gateway for reagent.
//!
//! All providers implement the `reagent_core::Provider` trait. The
//! [`ModelGateway`] wraps one of them with retry and normalization, and
//! [`build_from_config`] assembles the gateway the configuration asks for.

pub mod factory;
pub mod gateway;
pub mod openai_compat;

pub use factory::build_from_config;
pub use gateway::{ModelGateway, RetryPolicy, normalize_messages};
pub use openai_compat::OpenAiCompatProvider;
