pub mod common;
pub mod history;
pub mod run;
pub mod transfer;
pub mod utils;
