//! Fixed-window throttling and the request guard.

mod counter;
mod guard;
mod key;

pub use counter::{Decision, WindowCounter};
pub use guard::Guard;
pub use key::ClientKey;
