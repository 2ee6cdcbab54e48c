//! iacreate: build a content tree from a spreadsheet
//!
//! Each row of the first worksheet becomes one content node. Rows carry no parent pointer;
//! the parent follows from the row's level compared with the previous row's level.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
