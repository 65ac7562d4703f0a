pub mod client;
pub mod error;

pub use client::EventLogClient;
pub use error::EventLogError;
