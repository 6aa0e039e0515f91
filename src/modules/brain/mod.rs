pub mod llm;

pub use llm::Summarizer;
