use juniper::RootNode;

pub use super::context::{AcknowledgementPolicy, GqlContext};
pub use mutation::Mutation;
pub use query::Query;
pub use subscription::Subscription;

mod mutation;
mod query;
mod subscription;
mod types;

pub type Schema = RootNode<'static, Query, Mutation, Subscription>;

pub fn schema() -> Schema {
    Schema::new(Query, Mutation, Subscription)
}
