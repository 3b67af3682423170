pub mod domain;
pub mod error;
pub mod instruction;
pub mod protocol;
