//! Output formatting for council results

pub mod console;
