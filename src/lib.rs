pub mod config;
pub mod error;
pub mod fetch;
pub mod ids;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod scrape;
pub mod sink;
