//! # Event subscribers.
//!
//! ```text
//! node ops ── publish(Event) ──► Bus ──► subscriber listener ──► SubscriberSet
//!                                                   ┌──────────┬──────┴─────┐
//!                                                   ▼          ▼            ▼
//!                                               LogWriter   Metrics      Custom
//! ```
//!
//! Subscribers are attached with
//! [`ManagerBuilder::with_subscribers`](crate::ManagerBuilder::with_subscribers).
//! For ad-hoc consumption without a worker, use
//! [`ServiceManager::subscribe`](crate::ServiceManager::subscribe) instead.

#[cfg(feature = "logging")]
mod embedded;
mod subscribe;
mod subscriber_set;

#[cfg(feature = "logging")]
pub use embedded::LogWriter;
pub use subscribe::Subscribe;
pub use subscriber_set::SubscriberSet;
