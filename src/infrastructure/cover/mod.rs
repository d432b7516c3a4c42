//! Cover art infrastructure module

mod http;

pub use http::HttpCoverFetcher;
