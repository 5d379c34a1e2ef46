//! Operator input

pub mod task;
