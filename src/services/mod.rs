pub mod llm;
pub mod tutor;
