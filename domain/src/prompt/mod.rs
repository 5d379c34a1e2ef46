//! Prompt domain
//!
//! Fixed instructions placed in front of every decision oracle call.

mod template;

pub use template::PromptTemplate;
