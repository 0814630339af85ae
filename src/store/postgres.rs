//! PostgreSQL [`DurableStore`].
//!
//! Expects a `tourism_resources` table:
//!
//! ```sql
//! CREATE TABLE tourism_resources (
//!     id             BIGSERIAL PRIMARY KEY,
//!     resource_id    TEXT NOT NULL UNIQUE,
//!     name           JSONB NOT NULL DEFAULT '{}',
//!     description    JSONB NOT NULL DEFAULT '{}',
//!     resource_types TEXT[] NOT NULL DEFAULT '{}',
//!     city           TEXT,
//!     address        TEXT,
//!     latitude       DOUBLE PRECISION,
//!     longitude      DOUBLE PRECISION,
//!     creation_date  DATE,
//!     created_at     TIMESTAMPTZ NOT NULL DEFAULT now(),
//!     is_active      BOOLEAN NOT NULL DEFAULT TRUE
//! );
//! ```
//!
//! Geo filtering narrows with [`GeoPoint::bounds`] (split at the
//! antimeridian, no longitude range near a pole) and then applies the same
//! haversine bound as [`StoreQuery::matches`].

use super::{
    DurableStore, GeoPoint, GroupCount, GroupField, Resource, StoreQuery, StoreResult,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use std::collections::BTreeMap;
use tracing::debug;

const RESOURCE_COLUMNS: &str = "id, resource_id, name, description, resource_types, city, \
     address, latitude, longitude, creation_date, created_at, is_active";

#[derive(Debug, FromRow)]
struct ResourceRow {
    id: i64,
    resource_id: String,
    name: Json<BTreeMap<String, String>>,
    description: Json<BTreeMap<String, String>>,
    resource_types: Vec<String>,
    city: Option<String>,
    address: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    creation_date: Option<NaiveDate>,
    created_at: DateTime<Utc>,
    is_active: bool,
}

impl From<ResourceRow> for Resource {
    fn from(row: ResourceRow) -> Self {
        let location = match (row.latitude, row.longitude) {
            (Some(lat), Some(lng)) => Some(GeoPoint::new(lat, lng)),
            _ => None,
        };
        Self {
            id: row.id,
            resource_id: row.resource_id,
            name: row.name.0,
            description: row.description.0,
            resource_types: row.resource_types,
            city: row.city,
            address: row.address,
            location,
            creation_date: row.creation_date,
            created_at: row.created_at,
            is_active: row.is_active,
        }
    }
}

/// WHERE clause accumulator, one `AND` per predicate
struct Conditions<'q> {
    query: &'q mut QueryBuilder<'static, Postgres>,
    has_conditions: bool,
}

impl<'q> Conditions<'q> {
    fn new(query: &'q mut QueryBuilder<'static, Postgres>) -> Self {
        Self {
            query,
            has_conditions: false,
        }
    }

    fn next(&mut self) -> &mut QueryBuilder<'static, Postgres> {
        if self.has_conditions {
            self.query.push(" AND ");
        } else {
            self.query.push(" WHERE ");
            self.has_conditions = true;
        }
        &mut *self.query
    }

    fn apply(mut self, filter: &StoreQuery) {
        if filter.active_only {
            self.next().push("is_active = TRUE");
        }

        if !filter.resource_types.is_empty() {
            self.next()
                .push("resource_types && ")
                .push_bind(filter.resource_types.clone());
        }

        if !filter.cities.is_empty() {
            self.next()
                .push("city = ANY(")
                .push_bind(filter.cities.clone())
                .push(")");
        }

        if let Some(radius) = filter.within {
            let bounds = radius.center.bounds(radius.radius_km);
            self.next()
                .push("latitude BETWEEN ")
                .push_bind(bounds.min_lat)
                .push(" AND ")
                .push_bind(bounds.max_lat);

            if !bounds.lng_ranges.is_empty() {
                let query = self.next();
                query.push("(");
                for (i, (west, east)) in bounds.lng_ranges.iter().enumerate() {
                    if i > 0 {
                        query.push(" OR ");
                    }
                    query
                        .push("longitude BETWEEN ")
                        .push_bind(*west)
                        .push(" AND ")
                        .push_bind(*east);
                }
                query.push(")");
            }

            let lat = radius.center.lat;
            let lng = radius.center.lng;
            self.next()
                .push("2 * 6371 * asin(least(1, sqrt(power(sin(radians(latitude - ")
                .push_bind(lat)
                .push(") / 2), 2) + cos(radians(")
                .push_bind(lat)
                .push(")) * cos(radians(latitude)) * power(sin(radians(longitude - ")
                .push_bind(lng)
                .push(") / 2), 2)))) <= ")
                .push_bind(radius.radius_km);
        }

        if let Some(from) = filter.created_from {
            self.next().push("creation_date >= ").push_bind(from);
        }

        if let Some(to) = filter.created_to {
            self.next().push("creation_date <= ").push_bind(to);
        }

        let terms = filter.terms();
        if !terms.is_empty() {
            let query = self.next();
            query.push("(");
            for (i, term) in terms.iter().enumerate() {
                if i > 0 {
                    query.push(" OR ");
                }
                let pattern = format!("%{}%", escape_like(term));
                query
                    .push("EXISTS (SELECT 1 FROM jsonb_each_text(name) n WHERE n.value ILIKE ")
                    .push_bind(pattern.clone())
                    .push(") OR EXISTS (SELECT 1 FROM jsonb_each_text(description) d WHERE d.value ILIKE ")
                    .push_bind(pattern.clone())
                    .push(") OR city ILIKE ")
                    .push_bind(pattern.clone())
                    .push(" OR address ILIKE ")
                    .push_bind(pattern);
            }
            query.push(")");
        }
    }
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl DurableStore for PostgresStore {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn fetch(&self, id: i64) -> StoreResult<Option<Resource>> {
        let mut query: QueryBuilder<'static, Postgres> = QueryBuilder::new(format!(
            "SELECT {RESOURCE_COLUMNS} FROM tourism_resources WHERE id = "
        ));
        query.push_bind(id);

        let row = query
            .build_query_as::<ResourceRow>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Resource::from))
    }

    async fn find(&self, filter: &StoreQuery) -> StoreResult<Vec<Resource>> {
        let mut query: QueryBuilder<'static, Postgres> = QueryBuilder::new(format!(
            "SELECT {RESOURCE_COLUMNS} FROM tourism_resources"
        ));
        Conditions::new(&mut query).apply(filter);
        query.push(" ORDER BY id ASC");

        if let Some(limit) = filter.limit {
            query.push(" LIMIT ").push_bind(limit as i64);
        }
        if filter.offset > 0 {
            query.push(" OFFSET ").push_bind(filter.offset as i64);
        }

        debug!(sql = %query.sql(), "Durable store find");
        let rows = query
            .build_query_as::<ResourceRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Resource::from).collect())
    }

    async fn count(&self, filter: &StoreQuery) -> StoreResult<u64> {
        let mut query: QueryBuilder<'static, Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM tourism_resources");
        Conditions::new(&mut query).apply(filter);

        let (count,): (i64,) = query.build_query_as().fetch_one(&self.pool).await?;
        Ok(count.max(0) as u64)
    }

    async fn count_by(
        &self,
        filter: &StoreQuery,
        field: GroupField,
    ) -> StoreResult<Vec<GroupCount>> {
        let mut query: QueryBuilder<'static, Postgres> = match field {
            GroupField::ResourceType => QueryBuilder::new(
                "SELECT t AS key, COUNT(DISTINCT id) AS count \
                 FROM tourism_resources, unnest(resource_types) AS t",
            ),
            GroupField::City => {
                QueryBuilder::new("SELECT city AS key, COUNT(*) AS count FROM tourism_resources")
            }
        };

        let mut conditions = Conditions::new(&mut query);
        if field == GroupField::City {
            conditions.next().push("city IS NOT NULL AND city <> ''");
        }
        conditions.apply(&filter.unpaginated());

        query.push(" GROUP BY 1 ORDER BY 2 DESC, 1 ASC");

        let rows: Vec<(String, i64)> = query.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows
            .into_iter()
            .map(|(key, count)| (key, count.max(0) as u64))
            .collect())
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
