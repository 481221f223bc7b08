// Generation: cached/retrying completion calls and the stages built on them.
// All completion calls go through generator::Generator; nothing here talks to llm_client directly.

pub mod assembler;
pub mod generator;
pub mod prompts;
pub mod title;
