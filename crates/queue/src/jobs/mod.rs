//! Queue job payloads.

mod deliver;
mod inbox;

pub use deliver::DeliverJob;
pub use inbox::InboxJob;
