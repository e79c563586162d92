pub mod config;
pub mod error;

pub use config::{load_dotenv, WheelConfig};
pub use error::*;
