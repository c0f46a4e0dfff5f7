//! # Service abstractions.
//!
//! - [`Service`] - trait implemented by the managed components
//! - [`ServiceRef`] - shared handle to a constructed instance (`Arc<dyn Service>`)
//! - [`Factory`] / [`FactoryFn`] - how a node builds its instance
//! - [`ServiceContext`] - capability handed to every constructed instance

mod context;
mod factory;
mod service;

pub use context::ServiceContext;
pub use factory::{BuildFuture, Factory, FactoryFn, FactoryRef};
pub use service::{Service, ServiceRef};
