//! Public entry points for hosts: the C ABI and the JSON bodies it returns.

pub mod ffi;
pub mod response;

pub use response::PredictResponse;
