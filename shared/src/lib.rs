//! Wire types shared between the scheduling service and its callers.

pub mod api;
pub mod models;
