pub mod catalog;
pub mod config;
pub mod correlate;
pub mod error;
pub mod fetch;
pub mod output;
pub mod parser;
pub mod state;
pub mod stats;
pub mod window;
