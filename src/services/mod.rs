pub mod chapterizer;
pub mod gemini;
pub mod llm;
