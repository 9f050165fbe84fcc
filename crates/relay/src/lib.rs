pub mod engine;
pub mod errors;
pub mod ollama;
pub mod tool;
pub mod weather;
