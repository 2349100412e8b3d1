//! Value types shared by every layer of the subscription protocol.
//!
//! Nothing in here carries behavior beyond construction, equality and
//! read-only accessors.

mod key;
mod payload;
mod state;
mod update;
mod value;

pub use key::*;
pub use payload::*;
pub use state::*;
pub use update::*;
pub use value::*;
