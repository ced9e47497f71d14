pub mod answers_file;
pub mod app;
pub mod buffer;
pub mod config;
pub mod logging;
pub mod state;
pub mod utils;
