pub mod error;
pub mod rkusb;

pub use error::{Result, RkError};
