//! Model backends for thinkact.
//!
//! The reasoning loop only sees [`ModelBackend`](thinkact_core::provider::ModelBackend);
//! this crate supplies the HTTP implementation used by the CLI.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatBackend;
