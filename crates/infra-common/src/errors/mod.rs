pub mod types;

pub use types::{Error, Result};
