//! Queue workers.

mod deliver;
mod inbox;

pub use deliver::{deliver_worker, run_deliver, DeliverContext};
pub use inbox::{inbox_worker, run_inbox, InboxContext};
