//! URI rendering and subscription assembly.

pub mod subscription;
pub mod uri;

pub use subscription::{assemble, order_nodes, Subscription, SubscriptionAssembler};
pub use uri::render;
