//! Central tenant directory backed by the `tenant_registry` table.

use async_trait::async_trait;
use sqlx::{postgres::PgRow, Pool, Postgres, Row};
use tracing::debug;

use taskforge_core::{Error, NewTenant, Result, Tenant, TenantDirectory, TenantUpdate};

const TENANT_COLUMNS: &str = "id, name, database_url, external_database_id, search_index_name, \
                              provisioning_state, created_at, updated_at";

/// PostgreSQL implementation of TenantDirectory.
#[derive(Clone)]
pub struct PgTenantDirectory {
    pool: Pool<Postgres>,
}

impl PgTenantDirectory {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn parse_tenant_row(row: PgRow) -> Result<Tenant> {
        let state: String = row.get("provisioning_state");
        Ok(Tenant {
            id: row.get("id"),
            name: row.get("name"),
            database_url: row.get("database_url"),
            external_database_id: row.get("external_database_id"),
            search_index_name: row.get("search_index_name"),
            provisioning_state: state.parse()?,
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }
}

#[async_trait]
impl TenantDirectory for PgTenantDirectory {
    async fn list(&self) -> Result<Vec<Tenant>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM tenant_registry ORDER BY created_at DESC, id DESC",
            TENANT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.into_iter().map(Self::parse_tenant_row).collect()
    }

    async fn find(&self, id: i64) -> Result<Option<Tenant>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM tenant_registry WHERE id = $1",
            TENANT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.map(Self::parse_tenant_row).transpose()
    }

    async fn create(&self, tenant: NewTenant) -> Result<Tenant> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO tenant_registry
                (name, database_url, external_database_id, search_index_name, provisioning_state)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            TENANT_COLUMNS
        ))
        .bind(&tenant.name)
        .bind(&tenant.database_url)
        .bind(&tenant.external_database_id)
        .bind(&tenant.search_index_name)
        .bind(tenant.provisioning_state.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        let created = Self::parse_tenant_row(row)?;
        debug!(
            subsystem = "db",
            component = "directory",
            op = "create",
            tenant_id = created.id,
            state = %created.provisioning_state,
            "Recorded tenant"
        );
        Ok(created)
    }

    async fn update(&self, id: i64, update: TenantUpdate) -> Result<Tenant> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE tenant_registry SET
                name = COALESCE($2, name),
                provisioning_state = COALESCE($3, provisioning_state),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            TENANT_COLUMNS
        ))
        .bind(id)
        .bind(update.name.as_deref())
        .bind(update.provisioning_state.map(|s| s.as_str()))
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?
        .ok_or(Error::TenantNotFound(id))?;

        Self::parse_tenant_row(row)
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM tenant_registry WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::TenantNotFound(id));
        }
        Ok(())
    }
}
