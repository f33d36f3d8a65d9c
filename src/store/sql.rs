use super::{ClientStore, StoreBackend};
use crate::error::RegistryError;
use crate::model::{Address, Client, ClientUpdate, NewClient, Page};
use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

const SELECT_CLIENT: &str = r#"
    SELECT
        client.id,
        client.created_at,
        client.name,
        client.username,
        client.first_name,
        client.last_name,
        client.company_name,
        address.postal_code,
        address.city
    FROM client
    INNER JOIN address ON address.client_id = client.id
"#;

#[derive(Debug, sqlx::FromRow)]
struct ClientRow {
    id: i64,
    created_at: DateTime<Utc>,
    name: String,
    username: String,
    first_name: String,
    last_name: String,
    company_name: String,
    postal_code: String,
    city: String,
}

impl TryFrom<ClientRow> for Client {
    type Error = RegistryError;

    fn try_from(row: ClientRow) -> Result<Self, Self::Error> {
        let id = u64::try_from(row.id)
            .map_err(|error| RegistryError::Database(format!("invalid client id {}: {error}", row.id)))?;

        Ok(Client {
            id,
            created_at: row.created_at,
            name: row.name,
            username: row.username,
            first_name: row.first_name,
            last_name: row.last_name,
            company_name: row.company_name,
            address: Address {
                postal_code: row.postal_code,
                city: row.city,
            },
        })
    }
}

/// Relational store: a `client` table with a one-to-one `address` table.
///
/// The schema is migrated on connect.
pub struct SqlClientStore {
    pool: SqlitePool,
}

impl SqlClientStore {
    /// Open the database at `database_url`, creating the file if needed.
    ///
    /// `sqlite::memory:` gives a private database held by a single pooled
    /// connection that is never recycled.
    pub async fn connect(database_url: &str) -> Result<Self, RegistryError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|error| RegistryError::Configuration(format!("invalid DATABASE_URL: {error}")))?
            .create_if_missing(true);

        let in_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|error| RegistryError::Database(format!("failed to open database: {error}")))?;

        MIGRATOR
            .run(&pool)
            .await
            .map_err(|error| RegistryError::Database(format!("failed to run migrations: {error}")))?;

        Ok(Self { pool })
    }

    async fn fetch(&self, id: i64) -> Result<Option<Client>, RegistryError> {
        let sql = format!("{SELECT_CLIENT} WHERE client.id = ?");
        let row = sqlx::query_as::<_, ClientRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| RegistryError::Database(format!("failed to load client {id}: {error}")))?;

        row.map(Client::try_from).transpose()
    }
}

/// Ids outside SQLite's integer range cannot exist in the table
fn row_id(id: u64) -> Option<i64> {
    i64::try_from(id).ok()
}

fn clamp_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[async_trait]
impl ClientStore for SqlClientStore {
    async fn create(&self, client: NewClient) -> Result<Client, RegistryError> {
        // SQLite keeps microseconds; trimming up front makes reads match the returned value.
        let created_at = Utc::now().trunc_subsecs(6);

        let mut transaction = self.pool.begin().await.map_err(|error| {
            RegistryError::Database(format!("failed to start create transaction: {error}"))
        })?;

        let id = sqlx::query(
            r#"
            INSERT INTO client (created_at, name, username, first_name, last_name, company_name)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(created_at)
        .bind(&client.name)
        .bind(&client.username)
        .bind(&client.first_name)
        .bind(&client.last_name)
        .bind(&client.company_name)
        .execute(&mut *transaction)
        .await
        .map_err(|error| RegistryError::Database(format!("failed to insert client: {error}")))?
        .last_insert_rowid();

        sqlx::query("INSERT INTO address (client_id, postal_code, city) VALUES (?, ?, ?)")
            .bind(id)
            .bind(&client.postal_code)
            .bind(&client.city)
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                RegistryError::Database(format!("failed to insert address for client {id}: {error}"))
            })?;

        transaction.commit().await.map_err(|error| {
            RegistryError::Database(format!("failed to commit create transaction: {error}"))
        })?;

        let id = u64::try_from(id)
            .map_err(|error| RegistryError::Database(format!("invalid client id {id}: {error}")))?;
        Ok(Client::from_new(id, created_at, client))
    }

    async fn list(&self, page: Page) -> Result<Vec<Client>, RegistryError> {
        let sql = format!("{SELECT_CLIENT} ORDER BY client.id LIMIT ? OFFSET ?");
        let rows = sqlx::query_as::<_, ClientRow>(&sql)
            .bind(clamp_i64(page.limit))
            .bind(clamp_i64(page.skip))
            .fetch_all(&self.pool)
            .await
            .map_err(|error| RegistryError::Database(format!("failed to list clients: {error}")))?;

        rows.into_iter().map(Client::try_from).collect()
    }

    async fn get(&self, id: u64) -> Result<Option<Client>, RegistryError> {
        match row_id(id) {
            Some(id) => self.fetch(id).await,
            None => Ok(None),
        }
    }

    async fn update(
        &self,
        id: u64,
        changes: ClientUpdate,
    ) -> Result<Option<Client>, RegistryError> {
        let Some(id) = row_id(id) else {
            return Ok(None);
        };

        let mut transaction = self.pool.begin().await.map_err(|error| {
            RegistryError::Database(format!("failed to start update transaction: {error}"))
        })?;

        let updated = sqlx::query(
            r#"
            UPDATE client SET
                name = COALESCE(?, name),
                username = COALESCE(?, username),
                first_name = COALESCE(?, first_name),
                last_name = COALESCE(?, last_name),
                company_name = COALESCE(?, company_name)
            WHERE id = ?
            "#,
        )
        .bind(&changes.name)
        .bind(&changes.username)
        .bind(&changes.first_name)
        .bind(&changes.last_name)
        .bind(&changes.company_name)
        .bind(id)
        .execute(&mut *transaction)
        .await
        .map_err(|error| RegistryError::Database(format!("failed to update client {id}: {error}")))?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }

        sqlx::query(
            r#"
            UPDATE address SET
                postal_code = COALESCE(?, postal_code),
                city = COALESCE(?, city)
            WHERE client_id = ?
            "#,
        )
        .bind(&changes.postal_code)
        .bind(&changes.city)
        .bind(id)
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            RegistryError::Database(format!("failed to update address for client {id}: {error}"))
        })?;

        let sql = format!("{SELECT_CLIENT} WHERE client.id = ?");
        let row = sqlx::query_as::<_, ClientRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *transaction)
            .await
            .map_err(|error| RegistryError::Database(format!("failed to reload client {id}: {error}")))?;

        transaction.commit().await.map_err(|error| {
            RegistryError::Database(format!("failed to commit update transaction: {error}"))
        })?;

        row.map(Client::try_from).transpose()
    }

    async fn delete(&self, id: u64) -> Result<bool, RegistryError> {
        let Some(id) = row_id(id) else {
            return Ok(false);
        };

        let mut transaction = self.pool.begin().await.map_err(|error| {
            RegistryError::Database(format!("failed to start delete transaction: {error}"))
        })?;

        sqlx::query("DELETE FROM address WHERE client_id = ?")
            .bind(id)
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                RegistryError::Database(format!("failed to delete address for client {id}: {error}"))
            })?;

        let deleted = sqlx::query("DELETE FROM client WHERE id = ?")
            .bind(id)
            .execute(&mut *transaction)
            .await
            .map_err(|error| RegistryError::Database(format!("failed to delete client {id}: {error}")))?;

        transaction.commit().await.map_err(|error| {
            RegistryError::Database(format!("failed to commit delete transaction: {error}"))
        })?;

        Ok(deleted.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<(), RegistryError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(RegistryError::from)
    }

    fn backend(&self) -> StoreBackend {
        StoreBackend::Sql
    }
}
