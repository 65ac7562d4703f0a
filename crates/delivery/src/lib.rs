pub mod adapter;
pub mod error;
pub mod live;
pub mod simulate;
pub mod types;

pub use adapter::DeliveryAdapter;
pub use error::DeliveryError;
pub use types::{SendRequest, SendResult, SendStatus};
