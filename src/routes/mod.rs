mod health_check;
mod sdes_callback;
mod submit;

pub use health_check::health_check;
pub use sdes_callback::sdes_callback_handler;
pub use submit::submit_handler;
