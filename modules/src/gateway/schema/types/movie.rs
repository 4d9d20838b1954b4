use super::super::GqlContext;
use super::Actor;
use domain::catalog;
use juniper::{graphql_object, FieldResult, ID};
use std::convert::TryFrom;

pub struct Movie(catalog::Movie);

impl From<catalog::Movie> for Movie {
    fn from(movie: catalog::Movie) -> Self {
        Self(movie)
    }
}

#[graphql_object(context = GqlContext)]
impl Movie {
    fn id(&self) -> ID {
        ID::new(&self.0.id)
    }

    fn title(&self) -> &str {
        &self.0.title
    }

    /// Year of release, absent if unknown or out of range
    fn released(&self) -> Option<i32> {
        self.0.released.and_then(|year| i32::try_from(year).ok())
    }

    async fn actors(&self, context: &GqlContext) -> FieldResult<Vec<Actor>> {
        let actors = context.catalog.actors_in(&self.0.id).await?;
        Ok(actors.into_iter().map(Actor::from).collect())
    }
}
