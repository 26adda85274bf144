//! Postgres repository implementation using Diesel.
//!
//! Facilities live in a single `power_plants` table keyed by `gppd_idnr`.
//! Nullable numeric columns are filtered out by the same validity predicate
//! the in-memory repository applies, so both backends return identical pages.
//!
//! ## Features
//!
//! - Connection pooling with r2d2
//! - Automatic retry for transient failures
//! - Automatic migration execution
//!
//! ## Configuration
//!
//! Environment variables:
//! - `DATABASE_URL` or `PG_DATABASE_URL`: Connection string (required)
//! - `PG_POOL_MAX`: Maximum pool size (default: 10)
//! - `PG_POOL_MIN`: Minimum pool size (default: 1)
//! - `PG_CONN_TIMEOUT_SEC`: Connection timeout in seconds (default: 30)
//! - `PG_IDLE_TIMEOUT_SEC`: Idle connection timeout in seconds (default: 600)
//! - `PG_MAX_RETRIES`: Maximum retry attempts for transient failures (default: 3)
//! - `PG_RETRY_DELAY_MS`: Initial retry delay in milliseconds (default: 100)

use async_trait::async_trait;
use diesel::pg::{Pg, PgConnection};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sql_query;
use diesel::sql_types::{Nullable, Text};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;
use std::time::Duration;
use tokio::task;

use crate::db::repository::{
    ErrorContext, FacilityRepository, RepositoryError, RepositoryResult, StatsRepository,
};
use crate::models::{
    Facility, FacilityFilter, FacilityId, FacilityPage, PrimaryFuel, QueryFilter,
};
use crate::routes::countries::{CountryEntry, CountryFuelMix};
use crate::routes::stats::{FacilitySummary, FuelCapacity};

mod models;
mod schema;

use models::{CountryRow, FuelCapacityRow, FuelMixRow, PowerPlantRow, SummaryRow};
use schema::power_plants;

type PgPool = Pool<ConnectionManager<PgConnection>>;

define_sql_function!(fn lower(x: Nullable<Text>) -> Nullable<Text>);
define_sql_function!(fn btrim(x: Nullable<Text>) -> Nullable<Text>);
define_sql_function!(fn upper(x: Text) -> Text);
type BoxedPlants<'a> = power_plants::BoxedQuery<'a, Pg>;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("src/db/repositories/postgres/migrations");

const VALID_ROW_SQL: &str = "capacity_mw > 0 AND capacity_mw < 'Infinity'::float8 \
     AND latitude BETWEEN -90 AND 90 AND longitude BETWEEN -180 AND 180";

/// Configuration for connecting to Postgres.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL
    pub database_url: String,
    pub max_pool_size: u32,
    pub min_pool_size: u32,
    pub connection_timeout_sec: u64,
    pub idle_timeout_sec: u64,
    /// Maximum number of retry attempts for transient failures
    pub max_retries: u32,
    /// Initial retry delay in milliseconds (doubles with each retry)
    pub retry_delay_ms: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            max_pool_size: 10,
            min_pool_size: 1,
            connection_timeout_sec: 30,
            idle_timeout_sec: 600,
            max_retries: 3,
            retry_delay_ms: 100,
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl PostgresConfig {
    /// Create configuration from environment variables.
    pub fn from_env() -> Result<Self, String> {
        let database_url = std::env::var("DATABASE_URL")
            .or_else(|_| std::env::var("PG_DATABASE_URL"))
            .map_err(|_| "DATABASE_URL or PG_DATABASE_URL must be set".to_string())?;

        let defaults = Self::default();
        Ok(Self {
            database_url,
            max_pool_size: env_or("PG_POOL_MAX", defaults.max_pool_size),
            min_pool_size: env_or("PG_POOL_MIN", defaults.min_pool_size),
            connection_timeout_sec: env_or("PG_CONN_TIMEOUT_SEC", defaults.connection_timeout_sec),
            idle_timeout_sec: env_or("PG_IDLE_TIMEOUT_SEC", defaults.idle_timeout_sec),
            max_retries: env_or("PG_MAX_RETRIES", defaults.max_retries),
            retry_delay_ms: env_or("PG_RETRY_DELAY_MS", defaults.retry_delay_ms),
        })
    }

    /// Create a new configuration with a database URL.
    pub fn with_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Default::default()
        }
    }
}

/// Diesel-backed repository for Postgres.
#[derive(Clone, Debug)]
pub struct PostgresRepository {
    pool: PgPool,
    config: PostgresConfig,
}

impl PostgresRepository {
    /// Create a new repository and run pending migrations.
    pub fn new(config: PostgresConfig) -> RepositoryResult<Self> {
        let manager = ConnectionManager::<PgConnection>::new(&config.database_url);

        let pool = Pool::builder()
            .max_size(config.max_pool_size)
            .min_idle(Some(config.min_pool_size))
            .connection_timeout(Duration::from_secs(config.connection_timeout_sec))
            .idle_timeout(Some(Duration::from_secs(config.idle_timeout_sec)))
            .test_on_check_out(true)
            .build(manager)
            .map_err(|e| {
                RepositoryError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("create_pool")
                        .with_details(format!("max_size={}", config.max_pool_size)),
                )
            })?;

        {
            let mut conn = pool.get().map_err(|e| {
                RepositoryError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("get_connection_for_migrations"),
                )
            })?;
            Self::run_migrations(&mut conn)?;
        }

        log::info!(
            "Postgres repository ready (pool max={}, min={})",
            config.max_pool_size,
            config.min_pool_size
        );

        Ok(Self { pool, config })
    }

    fn run_migrations(conn: &mut PgConnection) -> RepositoryResult<()> {
        conn.run_pending_migrations(MIGRATIONS).map_err(|e| {
            RepositoryError::internal_with_context(
                format!("Migration failed: {}", e),
                ErrorContext::new("run_migrations"),
            )
        })?;
        Ok(())
    }

    /// Execute a database operation on the blocking pool, retrying transient
    /// failures with exponential backoff.
    async fn with_conn<T, F>(&self, operation: &'static str, f: F) -> RepositoryResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> RepositoryResult<T> + Send + 'static + Clone,
    {
        let pool = self.pool.clone();
        let max_retries = self.config.max_retries;
        let retry_delay_ms = self.config.retry_delay_ms;

        task::spawn_blocking(move || {
            let mut last_error = None;
            let mut retry_delay = Duration::from_millis(retry_delay_ms);

            for attempt in 0..=max_retries {
                if attempt > 0 {
                    log::warn!("Retrying {} (attempt {})", operation, attempt + 1);
                    std::thread::sleep(retry_delay);
                    retry_delay *= 2;
                }

                let mut conn = match pool.get() {
                    Ok(c) => c,
                    Err(e) => {
                        let err = RepositoryError::connection_with_context(
                            e.to_string(),
                            ErrorContext::new(operation)
                                .with_details(format!("attempt={}", attempt + 1)),
                        );
                        if attempt < max_retries {
                            last_error = Some(err);
                            continue;
                        }
                        return Err(err);
                    }
                };

                match f.clone()(&mut conn) {
                    Ok(result) => return Ok(result),
                    Err(e) if e.is_retryable() && attempt < max_retries => {
                        last_error = Some(e);
                        continue;
                    }
                    Err(e) => return Err(e.with_operation(operation)),
                }
            }

            Err(last_error.unwrap_or_else(|| {
                RepositoryError::internal("Max retries exceeded with no error captured")
            }))
        })
        .await
        .map_err(|e| {
            RepositoryError::internal_with_context(
                format!("Task join error: {}", e),
                ErrorContext::new("spawn_blocking"),
            )
        })?
    }
}

/// Rows satisfying the validity rules and `filter`, unordered and unwindowed.
fn filtered(filter: &FacilityFilter) -> BoxedPlants<'static> {
    use schema::power_plants::dsl::*;

    // NaN sorts above Infinity in Postgres, so the upper bound excludes both.
    let mut query = power_plants
        .filter(capacity_mw.gt(0.0))
        .filter(capacity_mw.lt(f64::INFINITY))
        .filter(latitude.between(-90.0, 90.0))
        .filter(longitude.between(-180.0, 180.0))
        .into_boxed();

    if let Some(bounds) = filter.bounds {
        query = query.filter(latitude.between(bounds.south, bounds.north));
        query = if bounds.wraps_antimeridian() {
            query.filter(longitude.ge(bounds.west).or(longitude.le(bounds.east)))
        } else {
            query.filter(longitude.between(bounds.west, bounds.east))
        };
    }

    if let Some(code) = &filter.country {
        query = query.filter(upper(country).eq(code.clone()));
    }

    // Labels are stored as imported; compare them the way `PrimaryFuel::from_label` does.
    let fuel_label = lower(btrim(primary_fuel));
    match filter.fuel {
        Some(PrimaryFuel::Other) => {
            let known: Vec<String> = PrimaryFuel::known_labels()
                .map(str::to_ascii_lowercase)
                .collect();
            query = query.filter(
                primary_fuel
                    .is_null()
                    .nullable()
                    .or(fuel_label.ne_all(known)),
            );
        }
        Some(fuel) => {
            query = query.filter(fuel_label.eq(fuel.as_str().to_ascii_lowercase()));
        }
        None => {}
    }

    query
}

fn to_sql_offset(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn fold_fuel_rows(rows: Vec<FuelCapacityRow>) -> Vec<FuelCapacity> {
    let mut by_fuel: BTreeMap<PrimaryFuel, f64> = BTreeMap::new();
    for row in rows {
        let fuel = row
            .primary_fuel
            .as_deref()
            .map(PrimaryFuel::from_label)
            .unwrap_or(PrimaryFuel::Other);
        *by_fuel.entry(fuel).or_insert(0.0) += row.capacity_mw;
    }

    let mut folded: Vec<FuelCapacity> = by_fuel
        .into_iter()
        .map(|(fuel, capacity_mw)| FuelCapacity { fuel, capacity_mw })
        .collect();
    folded.sort_by(|a, b| {
        b.capacity_mw
            .total_cmp(&a.capacity_mw)
            .then_with(|| a.fuel.cmp(&b.fuel))
    });
    folded
}

fn fold_fuel_mix_rows(rows: Vec<FuelMixRow>) -> Vec<CountryFuelMix> {
    CountryFuelMix::rollup(rows.into_iter().map(|row| {
        let fuel = row
            .primary_fuel
            .as_deref()
            .map(PrimaryFuel::from_label)
            .unwrap_or(PrimaryFuel::Other);
        (fuel, u64::try_from(row.facility_count).unwrap_or(0), row.capacity_mw)
    }))
}

fn load_fuel_rows(conn: &mut PgConnection) -> RepositoryResult<Vec<FuelCapacityRow>> {
    let sql = format!(
        "SELECT primary_fuel, SUM(capacity_mw)::float8 AS capacity_mw \
         FROM power_plants WHERE {} GROUP BY primary_fuel",
        VALID_ROW_SQL
    );
    Ok(sql_query(sql).load::<FuelCapacityRow>(conn)?)
}

#[async_trait]
impl FacilityRepository for PostgresRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        self.with_conn("health_check", |conn| {
            sql_query("SELECT 1").execute(conn)?;
            Ok(true)
        })
        .await
    }

    async fn query_facilities(&self, query: &QueryFilter) -> RepositoryResult<FacilityPage> {
        let query = query.clone();
        self.with_conn("query_facilities", move |conn| {
            use schema::power_plants::dsl::*;

            let total: i64 = filtered(&query.filter).count().get_result(conn)?;

            let rows: Vec<PowerPlantRow> = if query.limit == 0 {
                Vec::new()
            } else {
                filtered(&query.filter)
                    .order((capacity_mw.desc(), gppd_idnr.asc()))
                    .limit(i64::from(query.limit))
                    .offset(to_sql_offset(query.offset))
                    .select(PowerPlantRow::as_select())
                    .load(conn)?
            };

            Ok(FacilityPage {
                facilities: rows.into_iter().map(PowerPlantRow::into_facility).collect(),
                total: u64::try_from(total).unwrap_or(0),
                bounds: query.filter.bounds,
            })
        })
        .await
    }

    async fn get_facility(&self, id: &FacilityId) -> RepositoryResult<Option<Facility>> {
        let key = id.as_str().to_string();
        self.with_conn("get_facility", move |conn| {
            use schema::power_plants::dsl::*;

            let row = power_plants
                .filter(gppd_idnr.eq(&key))
                .select(PowerPlantRow::as_select())
                .first::<PowerPlantRow>(conn)
                .optional()?;
            Ok(row.map(PowerPlantRow::into_facility))
        })
        .await
    }
}

#[async_trait]
impl StatsRepository for PostgresRepository {
    async fn facility_summary(&self) -> RepositoryResult<FacilitySummary> {
        self.with_conn("facility_summary", |conn| {
            let sql = format!(
                "SELECT COUNT(*)::bigint AS total_facilities, \
                 COUNT(DISTINCT country)::bigint AS total_countries, \
                 COALESCE(SUM(capacity_mw), 0)::float8 AS total_capacity_mw \
                 FROM power_plants WHERE {}",
                VALID_ROW_SQL
            );
            let summary = sql_query(sql).get_result::<SummaryRow>(conn)?;
            if summary.total_facilities == 0 {
                return Ok(FacilitySummary::empty());
            }

            let fuels: BTreeSet<PrimaryFuel> = fold_fuel_rows(load_fuel_rows(conn)?)
                .into_iter()
                .map(|row| row.fuel)
                .collect();

            let count = summary.total_facilities as u64;
            Ok(FacilitySummary {
                total_facilities: count,
                total_countries: summary.total_countries as u64,
                fuel_types: fuels.len() as u64,
                avg_capacity_mw: summary.total_capacity_mw / count as f64,
                total_capacity_mw: summary.total_capacity_mw,
            })
        })
        .await
    }

    async fn capacity_by_fuel(&self) -> RepositoryResult<Vec<FuelCapacity>> {
        self.with_conn("capacity_by_fuel", |conn| {
            Ok(fold_fuel_rows(load_fuel_rows(conn)?))
        })
        .await
    }

    async fn countries(&self) -> RepositoryResult<Vec<CountryEntry>> {
        self.with_conn("countries", |conn| {
            let sql = format!(
                "SELECT upper(country) AS country, MIN(country_long) AS country_long \
                 FROM power_plants WHERE {} \
                 GROUP BY upper(country) \
                 ORDER BY country_long, country",
                VALID_ROW_SQL
            );
            let rows = sql_query(sql).load::<CountryRow>(conn)?;
            Ok(rows
                .into_iter()
                .map(|row| CountryEntry {
                    country_code: row.country,
                    country_name: row.country_long,
                })
                .collect())
        })
        .await
    }

    async fn country_fuel_mix(&self, country_code: &str) -> RepositoryResult<Vec<CountryFuelMix>> {
        let code = country_code.to_string();
        self.with_conn("country_fuel_mix", move |conn| {
            let sql = format!(
                "SELECT primary_fuel, COUNT(*)::bigint AS facility_count, \
                 SUM(capacity_mw)::float8 AS capacity_mw \
                 FROM power_plants WHERE {} AND upper(country) = $1 \
                 GROUP BY primary_fuel",
                VALID_ROW_SQL
            );
            let rows = sql_query(sql)
                .bind::<Text, _>(code.clone())
                .load::<FuelMixRow>(conn)?;
            Ok(fold_fuel_mix_rows(rows))
        })
        .await
    }
}
