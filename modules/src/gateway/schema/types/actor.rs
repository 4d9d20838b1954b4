use super::super::GqlContext;
use super::Movie;
use domain::catalog;
use juniper::{graphql_object, FieldResult, ID};

pub struct Actor(catalog::Actor);

impl From<catalog::Actor> for Actor {
    fn from(actor: catalog::Actor) -> Self {
        Self(actor)
    }
}

#[graphql_object(context = GqlContext)]
impl Actor {
    fn id(&self) -> ID {
        ID::new(&self.0.id)
    }

    fn name(&self) -> &str {
        &self.0.name
    }

    async fn movies(&self, context: &GqlContext) -> FieldResult<Vec<Movie>> {
        let movies = context.catalog.movies_of(&self.0.id).await?;
        Ok(movies.into_iter().map(Movie::from).collect())
    }
}
