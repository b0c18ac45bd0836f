#![forbid(unsafe_code)]

pub mod app;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod gemini;
pub mod llm;
pub mod logging;
pub mod openai;
pub mod records;
pub mod store;
