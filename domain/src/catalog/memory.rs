use super::{Actor, Catalog, CatalogError, Filter, Movie};
use async_trait::async_trait;
use std::collections::HashSet;

/// [`Catalog`] implementation backed by a fixed set of records
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    movies: Vec<Movie>,
    actors: Vec<Actor>,
    /// Pairs of (movie id, actor id)
    cast: HashSet<(String, String)>,
}

impl StaticCatalog {
    /// Creates an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a movie
    pub fn with_movie(mut self, movie: Movie) -> Self {
        self.movies.push(movie);
        self
    }

    /// Adds an actor
    pub fn with_actor(mut self, actor: Actor) -> Self {
        self.actors.push(actor);
        self
    }

    /// Records that an actor appeared in a movie
    pub fn with_cast(mut self, movie_id: &str, actor_id: &str) -> Self {
        self.cast.insert((movie_id.to_owned(), actor_id.to_owned()));
        self
    }

    fn select<T: Clone>(
        items: &[T],
        filter: &Filter,
        key: impl Fn(&T) -> &str,
    ) -> Vec<T> {
        let needle = filter.needle();
        let mut selected: Vec<T> = items
            .iter()
            .filter(|item| key(item).to_lowercase().contains(&needle))
            .cloned()
            .collect();

        selected.sort_by(|a, b| key(a).cmp(key(b)));
        selected.truncate(filter.limit() as usize);
        selected
    }
}

#[async_trait]
impl Catalog for StaticCatalog {
    async fn movies(&self, filter: &Filter) -> Result<Vec<Movie>, CatalogError> {
        Ok(Self::select(&self.movies, filter, |m| m.title.as_str()))
    }

    async fn movie(&self, id: &str) -> Result<Option<Movie>, CatalogError> {
        Ok(self.movies.iter().find(|m| m.id == id).cloned())
    }

    async fn actors(&self, filter: &Filter) -> Result<Vec<Actor>, CatalogError> {
        Ok(Self::select(&self.actors, filter, |a| a.name.as_str()))
    }

    async fn actor(&self, id: &str) -> Result<Option<Actor>, CatalogError> {
        Ok(self.actors.iter().find(|a| a.id == id).cloned())
    }

    async fn actors_in(&self, movie_id: &str) -> Result<Vec<Actor>, CatalogError> {
        let mut actors: Vec<Actor> = self
            .actors
            .iter()
            .filter(|a| self.cast.contains(&(movie_id.to_owned(), a.id.clone())))
            .cloned()
            .collect();

        actors.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(actors)
    }

    async fn movies_of(&self, actor_id: &str) -> Result<Vec<Movie>, CatalogError> {
        let mut movies: Vec<Movie> = self
            .movies
            .iter()
            .filter(|m| self.cast.contains(&(m.id.clone(), actor_id.to_owned())))
            .cloned()
            .collect();

        movies.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(movies)
    }
}

#[cfg(test)]
mod does {
    use super::*;

    fn catalog() -> StaticCatalog {
        StaticCatalog::new()
            .with_movie(Movie {
                id: "m2".into(),
                title: "The Matrix Reloaded".into(),
                released: Some(2003),
            })
            .with_movie(Movie {
                id: "m1".into(),
                title: "The Matrix".into(),
                released: Some(1999),
            })
            .with_movie(Movie {
                id: "m3".into(),
                title: "Cloud Atlas".into(),
                released: None,
            })
            .with_actor(Actor {
                id: "a1".into(),
                name: "Keanu Reeves".into(),
            })
            .with_actor(Actor {
                id: "a2".into(),
                name: "Carrie-Anne Moss".into(),
            })
            .with_cast("m1", "a1")
            .with_cast("m1", "a2")
            .with_cast("m2", "a1")
    }

    #[tokio::test]
    async fn filter_and_order_movies() {
        let filter = Filter {
            contains: Some("MATRIX".into()),
            limit: None,
        };

        let titles: Vec<String> = catalog()
            .movies(&filter)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.title)
            .collect();

        assert_eq!(titles, vec!["The Matrix", "The Matrix Reloaded"]);
    }

    #[tokio::test]
    async fn honor_limit() {
        let filter = Filter {
            contains: None,
            limit: Some(1),
        };

        let movies = catalog().movies(&filter).await.unwrap();
        assert_eq!(movies.len(), 1);
        assert_eq!(movies[0].title, "Cloud Atlas");
    }

    #[tokio::test]
    async fn follow_relationships() {
        let catalog = catalog();

        let cast: Vec<String> = catalog
            .actors_in("m1")
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(cast, vec!["Carrie-Anne Moss", "Keanu Reeves"]);

        let filmography: Vec<String> = catalog
            .movies_of("a1")
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(filmography, vec!["m1", "m2"]);
    }

    #[tokio::test]
    async fn look_up_by_id() {
        let catalog = catalog();

        assert_eq!(catalog.actor("a2").await.unwrap().unwrap().name, "Carrie-Anne Moss");
        assert!(catalog.movie("unknown").await.unwrap().is_none());
    }
}
