//! Redis connections which report failures to the [`jatsl`] job owning them

mod factory;
mod handle;
mod pubsub;
mod resource;

pub use factory::*;
pub use pubsub::*;
pub use resource::*;
