pub mod config;
pub mod context;
pub mod feed;
pub mod logging;
pub mod output;
pub mod scoring;
pub mod session;
