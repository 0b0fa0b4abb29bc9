use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use serde_aux::field_attributes::deserialize_number_from_string;
use shared_kernel::configuration::config;
use sqlx::postgres::{PgConnectOptions, PgSslMode};

#[derive(Debug, Deserialize)]
pub struct Settings {
    database: DatabaseSettings,
}

type DbName = String;

#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    host: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    port: u16,
    username: String,
    password: Secret<String>,
    database_name: DbName,
    require_ssl: bool,
}

impl Settings {
    fn parse() -> anyhow::Result<Self> {
        config::<Settings>()
    }

    fn without_db() -> anyhow::Result<(PgConnectOptions, DbName)> {
        let database = Self::parse()?.database;
        let ssl_mode = if database.require_ssl {
            PgSslMode::Require
        } else {
            PgSslMode::Prefer
        };
        Ok((
            PgConnectOptions::new()
                .host(&database.host)
                .username(&database.username)
                .password(database.password.expose_secret())
                .port(database.port)
                .ssl_mode(ssl_mode),
            database.database_name,
        ))
    }

    pub fn with_db() -> anyhow::Result<PgConnectOptions> {
        let (options, database_name) = Self::without_db()?;
        Ok(options.database(&database_name))
    }
}
