use super::{Actor, Catalog, CatalogError, Filter, Movie};
use async_trait::async_trait;
use library::graph::{query, required, FromRow, GraphDatabase, GraphError, Row};
use tracing::instrument;

const MOVIE_COLUMNS: &str = "m.id AS id, m.title AS title, m.released AS released";
const ACTOR_COLUMNS: &str = "a.id AS id, a.name AS name";

impl FromRow for Movie {
    fn from_row(row: &Row) -> Result<Self, GraphError> {
        Ok(Movie {
            id: required(row.get("id"), "id")?,
            title: required(row.get("title"), "title")?,
            released: row.get("released"),
        })
    }
}

impl FromRow for Actor {
    fn from_row(row: &Row) -> Result<Self, GraphError> {
        Ok(Actor {
            id: required(row.get("id"), "id")?,
            name: required(row.get("name"), "name")?,
        })
    }
}

/// [`Catalog`] implementation querying a neo4j database with Cypher
#[derive(Clone)]
pub struct Neo4jCatalog {
    database: GraphDatabase,
}

impl Neo4jCatalog {
    /// Creates a new instance on top of a connected database
    pub fn new(database: GraphDatabase) -> Self {
        Self { database }
    }
}

#[async_trait]
impl Catalog for Neo4jCatalog {
    #[instrument(skip(self))]
    async fn movies(&self, filter: &Filter) -> Result<Vec<Movie>, CatalogError> {
        let cypher = format!(
            "MATCH (m:Movie) WHERE toLower(m.title) CONTAINS $needle \
             RETURN {} ORDER BY m.title LIMIT $limit",
            MOVIE_COLUMNS
        );

        Ok(self
            .database
            .fetch(
                query(&cypher)
                    .param("needle", filter.needle())
                    .param("limit", filter.limit()),
            )
            .await?)
    }

    #[instrument(skip(self))]
    async fn movie(&self, id: &str) -> Result<Option<Movie>, CatalogError> {
        let cypher = format!("MATCH (m:Movie {{id: $id}}) RETURN {} LIMIT 1", MOVIE_COLUMNS);

        Ok(self
            .database
            .fetch_optional(query(&cypher).param("id", id.to_owned()))
            .await?)
    }

    #[instrument(skip(self))]
    async fn actors(&self, filter: &Filter) -> Result<Vec<Actor>, CatalogError> {
        let cypher = format!(
            "MATCH (a:Actor) WHERE toLower(a.name) CONTAINS $needle \
             RETURN {} ORDER BY a.name LIMIT $limit",
            ACTOR_COLUMNS
        );

        Ok(self
            .database
            .fetch(
                query(&cypher)
                    .param("needle", filter.needle())
                    .param("limit", filter.limit()),
            )
            .await?)
    }

    #[instrument(skip(self))]
    async fn actor(&self, id: &str) -> Result<Option<Actor>, CatalogError> {
        let cypher = format!("MATCH (a:Actor {{id: $id}}) RETURN {} LIMIT 1", ACTOR_COLUMNS);

        Ok(self
            .database
            .fetch_optional(query(&cypher).param("id", id.to_owned()))
            .await?)
    }

    #[instrument(skip(self))]
    async fn actors_in(&self, movie_id: &str) -> Result<Vec<Actor>, CatalogError> {
        let cypher = format!(
            "MATCH (:Movie {{id: $id}})-[:ACTED_IN]->(a:Actor) RETURN {} ORDER BY a.name",
            ACTOR_COLUMNS
        );

        Ok(self
            .database
            .fetch(query(&cypher).param("id", movie_id.to_owned()))
            .await?)
    }

    #[instrument(skip(self))]
    async fn movies_of(&self, actor_id: &str) -> Result<Vec<Movie>, CatalogError> {
        let cypher = format!(
            "MATCH (m:Movie)-[:ACTED_IN]->(:Actor {{id: $id}}) RETURN {} ORDER BY m.title",
            MOVIE_COLUMNS
        );

        Ok(self
            .database
            .fetch(query(&cypher).param("id", actor_id.to_owned()))
            .await?)
    }
}
