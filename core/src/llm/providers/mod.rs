//! Model backend implementations

pub mod openai;

pub use openai::OpenAiClient;
