//! Provider factory: the public entry point for chat and streaming.
//!
//! Implementation details are split into submodules under `src/client/`.

pub mod builder;
mod chat;
pub mod core;
mod policy;
pub mod registry;

pub use builder::ProviderFactoryBuilder;
pub use core::{ChatOptions, ProviderFactory};
pub use policy::RetryPolicy;
pub use registry::ProviderRegistry;
