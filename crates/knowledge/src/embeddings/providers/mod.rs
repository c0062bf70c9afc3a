pub mod huggingface;
pub mod mock;
pub mod ollama;
