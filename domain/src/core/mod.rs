//! Core domain concepts shared across all subdomains.
//!
//! - [`error::DomainError`] - domain-level errors
//! - [`string::preview`] - log-friendly one-line previews of message text

pub mod error;
pub mod string;
