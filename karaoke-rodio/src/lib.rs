pub mod error;
pub mod source;

pub use error::RodioSourceError;
pub use source::RodioSource;
