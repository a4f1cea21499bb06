//! Identity provider transport adapter

mod http;

pub use http::HttpTransport;
