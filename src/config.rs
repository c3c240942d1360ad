//! Configuration for DDL generation and live schema introspection
//!
//! Provides builders for the generator options and the connection descriptor.

use std::fmt;

use crate::types::Dialect;

/// What to do when a field's type matches no rule and no built-in mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnmappedTypePolicy {
    /// Use the dialect's fallback type (e.g. `VARCHAR(255)`) and log a warning
    #[default]
    Fallback,
    /// Fail with [`DdlError::UnmappedType`](crate::DdlError::UnmappedType)
    Reject,
}

/// Auto-increment syntax emitted for PostgreSQL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PostgresIdentity {
    /// `GENERATED BY DEFAULT AS IDENTITY`
    #[default]
    Identity,
    /// `SERIAL` / `BIGSERIAL` / `SMALLSERIAL` in place of the column type
    Serial,
}

/// Default MySQL table options
pub const DEFAULT_MYSQL_TABLE_OPTIONS: &str = "ENGINE=InnoDB DEFAULT CHARSET=utf8mb4";

/// Configuration shared by every dialect strategy
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Policy for fields that fall through to the dialect's fallback type
    pub unmapped_types: UnmappedTypePolicy,
    /// PostgreSQL identity column syntax
    pub postgres_identity: PostgresIdentity,
    /// Options appended to MySQL `CREATE TABLE` statements
    pub mysql_table_options: String,
    /// Compare table and column names case-insensitively (default: true)
    pub ignore_case: bool,
    /// Emit `DROP COLUMN` / `DROP TABLE` in migration DDL (default: false)
    pub allow_drop: bool,
}

impl GeneratorConfig {
    /// Create a new configuration builder
    pub fn builder() -> GeneratorConfigBuilder {
        GeneratorConfigBuilder::new()
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfigBuilder::new().build()
    }
}

/// Builder for GeneratorConfig
#[derive(Debug)]
pub struct GeneratorConfigBuilder {
    unmapped_types: UnmappedTypePolicy,
    postgres_identity: PostgresIdentity,
    mysql_table_options: String,
    ignore_case: bool,
    allow_drop: bool,
}

impl GeneratorConfigBuilder {
    pub fn new() -> Self {
        Self {
            unmapped_types: UnmappedTypePolicy::Fallback,
            postgres_identity: PostgresIdentity::Identity,
            mysql_table_options: DEFAULT_MYSQL_TABLE_OPTIONS.to_string(),
            ignore_case: true,
            allow_drop: false,
        }
    }

    /// Set the unmapped type policy (default: Fallback)
    pub fn unmapped_types(mut self, policy: UnmappedTypePolicy) -> Self {
        self.unmapped_types = policy;
        self
    }

    /// Set the PostgreSQL identity syntax (default: Identity)
    pub fn postgres_identity(mut self, identity: PostgresIdentity) -> Self {
        self.postgres_identity = identity;
        self
    }

    /// Set the MySQL table options (default: "ENGINE=InnoDB DEFAULT CHARSET=utf8mb4")
    pub fn mysql_table_options(mut self, options: impl Into<String>) -> Self {
        self.mysql_table_options = options.into();
        self
    }

    /// Enable or disable case-insensitive name comparison (default: true)
    pub fn ignore_case(mut self, enabled: bool) -> Self {
        self.ignore_case = enabled;
        self
    }

    /// Enable or disable drop statements in migration DDL (default: false)
    pub fn allow_drop(mut self, enabled: bool) -> Self {
        self.allow_drop = enabled;
        self
    }

    /// Build the configuration
    pub fn build(self) -> GeneratorConfig {
        GeneratorConfig {
            unmapped_types: self.unmapped_types,
            postgres_identity: self.postgres_identity,
            mysql_table_options: self.mysql_table_options,
            ignore_case: self.ignore_case,
            allow_drop: self.allow_drop,
        }
    }
}

impl Default for GeneratorConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Descriptor for a read-only catalog introspection session
#[derive(Clone)]
pub struct ConnectionConfig {
    /// Database URL, e.g. `postgres://localhost/app`
    pub url: String,
    /// Overrides the user in the URL
    pub username: Option<String>,
    /// Overrides the password in the URL
    pub password: Option<String>,
    /// Dialect of the target database
    pub dialect: Dialect,
    /// Schema to introspect (PostgreSQL default: "public", MySQL default: current database)
    pub schema: Option<String>,
}

impl ConnectionConfig {
    /// Create a new connection builder
    pub fn builder(url: impl Into<String>, dialect: Dialect) -> ConnectionConfigBuilder {
        ConnectionConfigBuilder::new(url, dialect)
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("dialect", &self.dialect)
            .field("schema", &self.schema)
            .finish()
    }
}

/// Builder for ConnectionConfig
#[derive(Debug)]
pub struct ConnectionConfigBuilder {
    config: ConnectionConfig,
}

impl ConnectionConfigBuilder {
    /// Create a new builder with the database URL and dialect
    pub fn new(url: impl Into<String>, dialect: Dialect) -> Self {
        Self {
            config: ConnectionConfig {
                url: url.into(),
                username: None,
                password: None,
                dialect,
                schema: None,
            },
        }
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.config.username = Some(username.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.config.password = Some(password.into());
        self
    }

    /// Set the schema (or MySQL database) to introspect
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.config.schema = Some(schema.into());
        self
    }

    /// Build the descriptor
    pub fn build(self) -> ConnectionConfig {
        self.config
    }
}
