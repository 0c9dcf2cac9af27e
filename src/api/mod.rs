//! API module - the narrow HTTP interface the UI layer calls

pub mod handlers;
pub mod routes;
