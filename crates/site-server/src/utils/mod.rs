pub mod crypto;
pub mod error;
pub mod random;
pub mod time;

pub use crypto::{decrypt, encrypt};
pub use random::random_string;
pub use time::{day_start, unix_now};
