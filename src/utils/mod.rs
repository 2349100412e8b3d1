mod backoff;
mod net;
pub(crate) mod scoped_timer;

pub use backoff::*;
pub use net::*;
