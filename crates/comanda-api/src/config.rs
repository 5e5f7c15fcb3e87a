use crate::auth::Credentials;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("invalid value for {var}: '{value}'")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreKind {
    Memory,
    Mongo { uri: String, database: String },
}

/// Process settings, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub store: StoreKind,
    pub secret: String,
    pub accounts: Vec<Credentials>,
    pub require_auth: bool,
    pub cors_origin: String,
    /// Seed this many fake users (plus proportional data) into the store.
    pub seed: Option<usize>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match get("RPPORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|_| ConfigError::Invalid {
                var: "RPPORT",
                value: raw,
            })?,
            None => 8080,
        };

        let store = match get("COMANDA_STORE").as_deref() {
            None | Some("memory") => StoreKind::Memory,
            Some("mongodb") => StoreKind::Mongo {
                uri: get("MONGODB_URI").ok_or(ConfigError::Missing("MONGODB_URI"))?,
                database: get("MONGODB_DATABASE").unwrap_or_else(|| "comanda".into()),
            },
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "COMANDA_STORE",
                    value: other.to_string(),
                });
            }
        };

        let require_auth = match get("COMANDA_REQUIRE_AUTH") {
            None => true,
            Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => true,
                "false" | "0" | "no" => false,
                _ => {
                    return Err(ConfigError::Invalid {
                        var: "COMANDA_REQUIRE_AUTH",
                        value: raw,
                    });
                }
            },
        };

        let seed = match get("COMANDA_SEED") {
            None => None,
            Some(raw) => Some(raw.trim().parse::<usize>().map_err(|_| ConfigError::Invalid {
                var: "COMANDA_SEED",
                value: raw,
            })?),
        };

        let accounts = [
            ("BE_ADMIN_USR", "BE_ADMIN_PWD"),
            ("BE_CLIENT_USR", "BE_CLIENT_PWD"),
        ]
        .into_iter()
        .filter_map(|(user, password)| {
            Some(Credentials {
                user: get(user)?,
                password: get(password)?,
            })
        })
        .collect();

        Ok(Self {
            host: get("RPHOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            store,
            secret: get("SECRET_KEY").ok_or(ConfigError::Missing("SECRET_KEY"))?,
            accounts,
            require_auth,
            cors_origin: get("COMANDA_CORS_ORIGIN")
                .unwrap_or_else(|| "http://localhost:4200".into()),
            seed,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
