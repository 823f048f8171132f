pub mod cityjson;
pub mod json;
