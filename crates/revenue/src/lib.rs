//! Revenue: the unified order feed and two-channel revenue aggregation.
//!
//! Gym payments and online storefront orders land in one feed; the
//! aggregator reconciles both channels over a date window.

pub mod aggregator;
pub mod orders;

pub use aggregator::{ChannelFilter, RevenueAggregator, RevenueBreakdown, RevenueReport};
pub use orders::{Order, OrderFeed, OrderStatus, SalesChannel};
