pub mod file;
pub mod serde;
pub mod table;
