//! Client-side style content cache with time-based expiry.
//!
//! Entries live in the same key/value storage as the session blobs, so a
//! file-backed storage keeps them across restarts:
//!
//! ```toml
//! [cache]
//! expiry_hours = 24
//! ```

mod store;

pub use store::{DEFAULT_EXPIRY, ExpiringCache};
