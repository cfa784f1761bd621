pub mod error;
pub mod logging;

pub use error::SessionError;
pub use logging::init_logging;
