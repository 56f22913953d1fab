pub mod common;
pub mod filters;
pub mod progress;
pub mod progress_parser;
pub mod request;
pub mod resolver;
pub mod worker;
