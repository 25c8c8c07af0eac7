pub mod bytes;
pub mod error;
pub mod path;
pub mod time;
