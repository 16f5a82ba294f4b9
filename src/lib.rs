// Crate root library declaration and module exports.
pub mod cli;
pub mod config;
pub mod context;
pub mod extract;
pub mod model;
pub mod ocr;
pub mod storage;
