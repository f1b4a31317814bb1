pub mod client;
pub mod models;
pub mod parse;
pub mod prompts;

pub use client::LlmClient;
pub use prompts::PromptShape;
