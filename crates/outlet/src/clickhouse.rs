//! ClickHouse HTTP transport
//!
//! Inserts go through the HTTP interface as `INSERT ... FORMAT JSONEachRow`
//! with credentials and settings passed as query parameters. The liveness
//! probe is the `/ping` endpoint. `dial` only builds the handle; the connect
//! algorithm's probe decides whether a server is usable.

use std::time::Duration;

use contracts::{Connection, Connector, DestinationConfig, InsertMode, InsertPayload, OutletError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Connector for the servers of one ClickHouse destination
#[derive(Debug, Clone)]
pub struct HttpConnector {
    client: reqwest::Client,
    database: String,
    username: String,
    password: Option<String>,
}

impl HttpConnector {
    /// Build a connector from the destination's connection options
    ///
    /// # Errors
    /// Fails when the HTTP client cannot be constructed.
    pub fn new(config: &DestinationConfig) -> Result<Self, OutletError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| OutletError::transport(format!("failed to build http client: {e}")))?;

        Ok(Self {
            client,
            database: config.database.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }
}

impl Connector for HttpConnector {
    type Conn = HttpConnection;

    async fn dial(&self, server: &str) -> Result<Self::Conn, OutletError> {
        let base_url = if server.starts_with("http://") || server.starts_with("https://") {
            server.trim_end_matches('/').to_string()
        } else {
            format!("http://{server}")
        };

        Ok(HttpConnection {
            client: self.client.clone(),
            base_url,
            database: self.database.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
        })
    }
}

/// Handle to one ClickHouse server
#[derive(Debug)]
pub struct HttpConnection {
    client: reqwest::Client,
    base_url: String,
    database: String,
    username: String,
    password: Option<String>,
}

impl HttpConnection {
    fn insert_url(&self, table: &str, mode: InsertMode) -> String {
        let query = format!("INSERT INTO {table} FORMAT JSONEachRow");
        let mut url = format!(
            "{}/?database={}&user={}&query={}",
            self.base_url,
            urlencoding::encode(&self.database),
            urlencoding::encode(&self.username),
            urlencoding::encode(&query),
        );
        if let Some(password) = &self.password {
            url.push_str("&password=");
            url.push_str(&urlencoding::encode(password));
        }
        if let InsertMode::Async { busy_timeout } = mode {
            url.push_str(&format!(
                "&async_insert=1&wait_for_async_insert=1&async_insert_busy_timeout_max_ms={}",
                busy_timeout.as_millis()
            ));
        }
        url
    }
}

impl Connection for HttpConnection {
    async fn ping(&mut self) -> Result<(), OutletError> {
        let url = format!("{}/ping", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| OutletError::transport(format!("ping request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(OutletError::transport(format!(
                "ping returned status {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn insert(
        &mut self,
        payload: &InsertPayload,
        mode: InsertMode,
    ) -> Result<(), OutletError> {
        let url = self.insert_url(&payload.table, mode);
        let response = self
            .client
            .post(&url)
            .body(payload.body.clone())
            .send()
            .await
            .map_err(|e| OutletError::transport(format!("insert request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OutletError::transport(format!(
                "insert returned status {status}: {body}"
            )));
        }
        Ok(())
    }
}
