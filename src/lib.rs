mod error;
mod sect5;
mod sect7;
pub mod utils;

pub use error::{PackError, Result};
pub use sect7::{complex_pack, complex_unpack, spec_unpack};
