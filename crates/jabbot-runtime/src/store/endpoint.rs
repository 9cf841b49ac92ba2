//! Store connection strings.

use std::fmt;

use url::Url;

use jabbot_core::{StoreError, StoreResult};

/// Port used when the URL has none.
pub const DEFAULT_PORT: u16 = 6379;

/// Where the counter store lives: `redis://[:password@]host[:port][/db]`.
#[derive(Clone, PartialEq, Eq)]
pub struct StoreEndpoint {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    /// Database index selected after connecting.
    pub database: Option<u32>,
}

impl StoreEndpoint {
    /// Parses a `redis://` URL.
    pub fn parse(raw: &str) -> StoreResult<Self> {
        let invalid = |reason: String| StoreError::InvalidEndpoint {
            url: redact(raw),
            reason,
        };

        let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
        match url.scheme() {
            "redis" => {}
            "rediss" => return Err(invalid("TLS connections are not supported".into())),
            other => return Err(invalid(format!("unsupported scheme '{other}'"))),
        }

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| invalid("missing host".into()))?
            .to_string();

        let password = url
            .password()
            .map(|p| urlencoding::decode(p).map(|p| p.into_owned()))
            .transpose()
            .map_err(|e| invalid(format!("password is not valid UTF-8: {e}")))?;

        let database = match url.path().trim_start_matches('/') {
            "" => None,
            db => Some(
                db.parse::<u32>()
                    .map_err(|_| invalid(format!("'{db}' is not a database index")))?,
            ),
        };

        Ok(Self {
            host,
            port: url.port().unwrap_or(DEFAULT_PORT),
            password,
            database,
        })
    }

    /// `host:port`, suitable for `TcpStream::connect`.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for StoreEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "redis://{}:{}", self.host, self.port)?;
        if let Some(db) = self.database {
            write!(f, "/{db}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for StoreEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreEndpoint")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("database", &self.database)
            .finish()
    }
}

/// Hides the user-info part of a URL so passwords never reach the logs.
fn redact(raw: &str) -> String {
    match (raw.find("://"), raw.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://<redacted>@{}", &raw[..scheme_end], &raw[at + 1..])
        }
        _ => raw.to_string(),
    }
}
