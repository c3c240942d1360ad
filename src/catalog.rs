//! Live catalog introspection
//!
//! Reads tables, columns, primary keys and foreign keys from a running
//! PostgreSQL or MySQL database into [`DatabaseTableInfo`] snapshots. Sessions
//! are short-lived: one pooled connection, read-only where the driver allows,
//! closed before returning.

use std::str::FromStr;

use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::{Executor, Row};
use tracing::{debug, info};

use crate::config::ConnectionConfig;
use crate::error::{DdlError, Result};
use crate::schema::{DatabaseColumnInfo, DatabaseTableInfo};
use crate::types::{Dialect, ForeignKeyInfo};

/// Schema introspected on PostgreSQL when none is configured
pub const DEFAULT_POSTGRES_SCHEMA: &str = "public";

/// Snapshot every table of the configured schema
pub async fn introspect(config: &ConnectionConfig) -> Result<Vec<DatabaseTableInfo>> {
    match config.dialect {
        Dialect::Postgresql => {
            let catalog = PgCatalog::connect(config).await?;
            let schema = config.schema.as_deref().unwrap_or(DEFAULT_POSTGRES_SCHEMA);
            let tables = catalog.extract_schema(schema).await;
            catalog.close().await;
            tables
        }
        Dialect::Mysql => {
            let catalog = MySqlCatalog::connect(config).await?;
            let tables = match config.schema.as_deref() {
                Some(schema) => catalog.extract_schema(schema).await,
                None => match catalog.current_database().await {
                    Ok(schema) => catalog.extract_schema(&schema).await,
                    Err(e) => Err(e),
                },
            };
            catalog.close().await;
            tables
        }
        other => Err(DdlError::unsupported("Live schema introspection", other)),
    }
}

/// Empty strings from the catalog mean "no value"
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn column_size(length: Option<i64>) -> Option<u32> {
    length.and_then(|l| u32::try_from(l).ok())
}

// ============================================================================
// PostgreSQL
// ============================================================================

/// PostgreSQL catalog reader over `pg_catalog`
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    /// Open a single read-only connection
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let mut options = PgConnectOptions::from_str(&config.url).map_err(|e| {
            DdlError::connection(format!("Invalid database URL: {}", e))
        })?;
        if let Some(username) = &config.username {
            options = options.username(username);
        }
        if let Some(password) = &config.password {
            options = options.password(password);
        }
        let options = options.options([("default_transaction_read_only", "on")]);

        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| DdlError::connection(format!("Database connection failed: {}", e)))?;

        Ok(Self { pool })
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn extract_schema(&self, schema: &str) -> Result<Vec<DatabaseTableInfo>> {
        let query = r#"
            SELECT
                c.relname::text AS table_name,
                obj_description(c.oid, 'pg_class') AS table_comment
            FROM pg_catalog.pg_class c
            JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
            WHERE n.nspname = $1
              AND c.relkind IN ('r', 'p')
            ORDER BY c.relname
        "#;

        let rows = sqlx::query(query).bind(schema).fetch_all(&self.pool).await?;

        let mut tables = Vec::with_capacity(rows.len());
        for row in rows {
            let mut table = DatabaseTableInfo::new(row.try_get::<String, _>("table_name")?);
            table.comment = non_empty(row.try_get("table_comment")?);

            self.load_columns(schema, &mut table).await?;
            self.load_primary_key(schema, &mut table).await?;
            self.load_foreign_keys(schema, &mut table).await?;

            debug!(
                "Loaded {} columns for {}.{}",
                table.columns.len(),
                schema,
                table.name
            );
            tables.push(table);
        }

        info!("Extracted {} tables from schema '{}'", tables.len(), schema);
        Ok(tables)
    }

    async fn load_columns(&self, schema: &str, table: &mut DatabaseTableInfo) -> Result<()> {
        // atttypmod carries the declared length + 4 for varchar/bpchar
        let query = r#"
            SELECT
                a.attname::text AS column_name,
                format_type(a.atttypid, a.atttypmod) AS data_type,
                CASE
                    WHEN a.atttypid IN ('varchar'::regtype, 'bpchar'::regtype) AND a.atttypmod > 4
                    THEN (a.atttypmod - 4)::int8
                END AS char_length,
                NOT a.attnotnull AS is_nullable,
                pg_get_expr(d.adbin, d.adrelid) AS column_default,
                col_description(c.oid, a.attnum) AS column_comment
            FROM pg_catalog.pg_attribute a
            JOIN pg_catalog.pg_class c ON c.oid = a.attrelid
            JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
            LEFT JOIN pg_catalog.pg_attrdef d ON d.adrelid = a.attrelid AND d.adnum = a.attnum
            WHERE n.nspname = $1
              AND c.relname = $2
              AND a.attnum > 0
              AND NOT a.attisdropped
            ORDER BY a.attnum
        "#;

        let rows = sqlx::query(query)
            .bind(schema)
            .bind(&table.name)
            .fetch_all(&self.pool)
            .await?;

        for row in rows {
            table.columns.push(DatabaseColumnInfo {
                name: row.try_get("column_name")?,
                type_name: row.try_get("data_type")?,
                size: column_size(row.try_get("char_length")?),
                nullable: row.try_get("is_nullable")?,
                default_value: row.try_get("column_default")?,
                comment: non_empty(row.try_get("column_comment")?),
            });
        }
        Ok(())
    }

    async fn load_primary_key(&self, schema: &str, table: &mut DatabaseTableInfo) -> Result<()> {
        let query = r#"
            SELECT a.attname::text AS column_name
            FROM pg_catalog.pg_constraint con
            JOIN pg_catalog.pg_class c ON c.oid = con.conrelid
            JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
            JOIN LATERAL unnest(con.conkey) WITH ORDINALITY AS k(attnum, ord) ON true
            JOIN pg_catalog.pg_attribute a ON a.attrelid = c.oid AND a.attnum = k.attnum
            WHERE n.nspname = $1
              AND c.relname = $2
              AND con.contype = 'p'
            ORDER BY k.ord
        "#;

        let rows = sqlx::query(query)
            .bind(schema)
            .bind(&table.name)
            .fetch_all(&self.pool)
            .await?;

        for row in rows {
            table.primary_keys.push(row.try_get("column_name")?);
        }
        Ok(())
    }

    async fn load_foreign_keys(&self, schema: &str, table: &mut DatabaseTableInfo) -> Result<()> {
        let query = r#"
            SELECT
                con.conname::text AS constraint_name,
                a.attname::text AS column_name,
                rt.relname::text AS referenced_table,
                ra.attname::text AS referenced_column
            FROM pg_catalog.pg_constraint con
            JOIN pg_catalog.pg_class c ON c.oid = con.conrelid
            JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
            JOIN pg_catalog.pg_class rt ON rt.oid = con.confrelid
            JOIN LATERAL unnest(con.conkey, con.confkey) WITH ORDINALITY AS k(attnum, ref_attnum, ord) ON true
            JOIN pg_catalog.pg_attribute a ON a.attrelid = c.oid AND a.attnum = k.attnum
            JOIN pg_catalog.pg_attribute ra ON ra.attrelid = rt.oid AND ra.attnum = k.ref_attnum
            WHERE n.nspname = $1
              AND c.relname = $2
              AND con.contype = 'f'
            ORDER BY con.conname, k.ord
        "#;

        let rows = sqlx::query(query)
            .bind(schema)
            .bind(&table.name)
            .fetch_all(&self.pool)
            .await?;

        for row in rows {
            let fk = ForeignKeyInfo::new(
                row.try_get::<String, _>("column_name")?,
                row.try_get::<String, _>("referenced_table")?,
                row.try_get::<String, _>("referenced_column")?,
            )
            .named(row.try_get::<String, _>("constraint_name")?);
            table.foreign_keys.push(fk);
        }
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

// ============================================================================
// MySQL
// ============================================================================

/// MySQL catalog reader over `INFORMATION_SCHEMA`
pub struct MySqlCatalog {
    pool: MySqlPool,
}

impl MySqlCatalog {
    /// Open a single connection with a read-only session
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let mut options = MySqlConnectOptions::from_str(&config.url).map_err(|e| {
            DdlError::connection(format!("Invalid database URL: {}", e))
        })?;
        if let Some(username) = &config.username {
            options = options.username(username);
        }
        if let Some(password) = &config.password {
            options = options.password(password);
        }

        let pool = MySqlPoolOptions::new()
            .max_connections(1)
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    conn.execute("SET SESSION TRANSACTION READ ONLY").await?;
                    Ok(())
                })
            })
            .connect_with(options)
            .await
            .map_err(|e| DdlError::connection(format!("Database connection failed: {}", e)))?;

        Ok(Self { pool })
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Database selected by the connection URL
    pub async fn current_database(&self) -> Result<String> {
        let row = sqlx::query("SELECT CAST(DATABASE() AS CHAR(255)) AS db")
            .fetch_one(&self.pool)
            .await?;
        non_empty(row.try_get("db")?)
            .ok_or_else(|| DdlError::introspection("No database selected and no schema configured"))
    }

    pub async fn extract_schema(&self, schema: &str) -> Result<Vec<DatabaseTableInfo>> {
        // CAST to CHAR to handle collation and binary-string differences
        let query = r#"
            SELECT
                CAST(TABLE_NAME AS CHAR(255)) AS table_name,
                CAST(TABLE_COMMENT AS CHAR(2048)) AS table_comment
            FROM INFORMATION_SCHEMA.TABLES
            WHERE TABLE_SCHEMA = ?
              AND TABLE_TYPE = 'BASE TABLE'
            ORDER BY TABLE_NAME
        "#;

        let rows = sqlx::query(query).bind(schema).fetch_all(&self.pool).await?;

        let mut tables = Vec::with_capacity(rows.len());
        for row in rows {
            let mut table = DatabaseTableInfo::new(row.try_get::<String, _>("table_name")?);
            table.comment = non_empty(row.try_get("table_comment")?);

            self.load_columns(schema, &mut table).await?;
            self.load_primary_key(schema, &mut table).await?;
            self.load_foreign_keys(schema, &mut table).await?;

            debug!(
                "Loaded {} columns for {}.{}",
                table.columns.len(),
                schema,
                table.name
            );
            tables.push(table);
        }

        info!("Extracted {} tables from schema '{}'", tables.len(), schema);
        Ok(tables)
    }

    async fn load_columns(&self, schema: &str, table: &mut DatabaseTableInfo) -> Result<()> {
        let query = r#"
            SELECT
                CAST(COLUMN_NAME AS CHAR(255)) AS column_name,
                CAST(COLUMN_TYPE AS CHAR(255)) AS column_type,
                CAST(CHARACTER_MAXIMUM_LENGTH AS SIGNED) AS char_length,
                CAST(IF(IS_NULLABLE = 'YES', 1, 0) AS SIGNED) AS is_nullable,
                CAST(COLUMN_DEFAULT AS CHAR(1024)) AS column_default,
                CAST(COLUMN_COMMENT AS CHAR(1024)) AS column_comment
            FROM INFORMATION_SCHEMA.COLUMNS
            WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
            ORDER BY ORDINAL_POSITION
        "#;

        let rows = sqlx::query(query)
            .bind(schema)
            .bind(&table.name)
            .fetch_all(&self.pool)
            .await?;

        for row in rows {
            table.columns.push(DatabaseColumnInfo {
                name: row.try_get("column_name")?,
                type_name: row.try_get("column_type")?,
                size: column_size(row.try_get("char_length")?),
                nullable: row.try_get::<i64, _>("is_nullable")? == 1,
                default_value: row.try_get("column_default")?,
                comment: non_empty(row.try_get("column_comment")?),
            });
        }
        Ok(())
    }

    async fn load_primary_key(&self, schema: &str, table: &mut DatabaseTableInfo) -> Result<()> {
        let query = r#"
            SELECT CAST(COLUMN_NAME AS CHAR(255)) AS column_name
            FROM INFORMATION_SCHEMA.KEY_COLUMN_USAGE
            WHERE TABLE_SCHEMA = ?
              AND TABLE_NAME = ?
              AND CONSTRAINT_NAME = 'PRIMARY'
            ORDER BY ORDINAL_POSITION
        "#;

        let rows = sqlx::query(query)
            .bind(schema)
            .bind(&table.name)
            .fetch_all(&self.pool)
            .await?;

        for row in rows {
            table.primary_keys.push(row.try_get("column_name")?);
        }
        Ok(())
    }

    async fn load_foreign_keys(&self, schema: &str, table: &mut DatabaseTableInfo) -> Result<()> {
        let query = r#"
            SELECT
                CAST(CONSTRAINT_NAME AS CHAR(255)) AS constraint_name,
                CAST(COLUMN_NAME AS CHAR(255)) AS column_name,
                CAST(REFERENCED_TABLE_NAME AS CHAR(255)) AS referenced_table,
                CAST(REFERENCED_COLUMN_NAME AS CHAR(255)) AS referenced_column
            FROM INFORMATION_SCHEMA.KEY_COLUMN_USAGE
            WHERE TABLE_SCHEMA = ?
              AND TABLE_NAME = ?
              AND REFERENCED_TABLE_NAME IS NOT NULL
            ORDER BY CONSTRAINT_NAME, ORDINAL_POSITION
        "#;

        let rows = sqlx::query(query)
            .bind(schema)
            .bind(&table.name)
            .fetch_all(&self.pool)
            .await?;

        for row in rows {
            let fk = ForeignKeyInfo::new(
                row.try_get::<String, _>("column_name")?,
                row.try_get::<String, _>("referenced_table")?,
                row.try_get::<String, _>("referenced_column")?,
            )
            .named(row.try_get::<String, _>("constraint_name")?);
            table.foreign_keys.push(fk);
        }
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
