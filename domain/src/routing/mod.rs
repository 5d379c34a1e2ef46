//! Routing domain.
//!
//! - [`action`] - the routing actions offered to the decision oracle and the calls it returns
//! - [`decision::RoutingDecision`] - a validated, typed routing choice
//! - [`round`] - broadcast round bookkeeping

pub mod action;
pub mod decision;
pub mod round;
