use super::types::{Actor, Movie};
use super::GqlContext;
use domain::catalog::Filter;
use juniper::{graphql_object, FieldResult, ID};
use std::convert::TryFrom;

pub struct Query;

fn filter(contains: Option<String>, limit: Option<i32>) -> Filter {
    Filter {
        contains,
        limit: limit.map(i64::from),
    }
}

#[graphql_object(context = GqlContext)]
impl Query {
    async fn movies(
        &self,
        title_contains: Option<String>,
        limit: Option<i32>,
        context: &GqlContext,
    ) -> FieldResult<Vec<Movie>> {
        let movies = context
            .catalog
            .movies(&filter(title_contains, limit))
            .await?;

        Ok(movies.into_iter().map(Movie::from).collect())
    }

    async fn movie(&self, id: ID, context: &GqlContext) -> FieldResult<Option<Movie>> {
        Ok(context.catalog.movie(&id).await?.map(Movie::from))
    }

    async fn actors(
        &self,
        name_contains: Option<String>,
        limit: Option<i32>,
        context: &GqlContext,
    ) -> FieldResult<Vec<Actor>> {
        let actors = context
            .catalog
            .actors(&filter(name_contains, limit))
            .await?;

        Ok(actors.into_iter().map(Actor::from).collect())
    }

    async fn actor(&self, id: ID, context: &GqlContext) -> FieldResult<Option<Actor>> {
        Ok(context.catalog.actor(&id).await?.map(Actor::from))
    }

    /// Number of notification subscriptions held by this instance
    async fn notification_subscribers(&self, context: &GqlContext) -> FieldResult<i32> {
        let count = context.channel.subscriber_count().await?;
        Ok(i32::try_from(count).unwrap_or(i32::MAX))
    }
}
