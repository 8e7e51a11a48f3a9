pub mod driver;
pub mod order;
pub mod stream;

pub use driver::DriverLocation;
pub use order::{ApiError, Order, StatusCode};
pub use stream::{Channel, StreamEvent};
