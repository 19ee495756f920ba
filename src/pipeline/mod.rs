//! The three task handlers (§4.3-4.5), wired into `worker::handler::HandlerRegistry` at startup.

pub mod extract_links_handler;
pub mod retrieve_analysis_handler;
pub mod scrape_handler;
