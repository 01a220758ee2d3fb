//! Langbase Pipes client used as the answering model.

mod client;
mod types;


pub use client::LangbaseClient;
pub use types::*;
