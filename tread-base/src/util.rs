//! Tools that we could imagine being in the Rust standard library, but aren't.

mod custom_format;
pub use custom_format::*;

pub mod log;

#[doc(hidden)] // for use in internal tests only
#[allow(clippy::missing_inline_in_public_items)]
pub fn assert_send_sync<T: Send + Sync>() {
    // We don't need to do anything in this function; the call to it having been successfully
    // compiled is the assertion.
}
