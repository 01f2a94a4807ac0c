pub mod common;
pub mod handlers;
pub mod sarif;
