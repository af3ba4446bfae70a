mod email;
pub mod helpers;
mod secret;

pub use email::is_valid_email;
pub use secret::Secret;
