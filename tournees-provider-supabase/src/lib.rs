//! Source fetching producer records from a Supabase (`PostgREST`) table.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use tracing::{info, warn};

use tournees_core::{
    model::{ProducerRecord, SourceMeta},
    plugin::SourcePlugin,
    ports::{PortError, RecordPort, SourceBatch},
};

const REST_PATH: &str = "rest/v1";

/// Connection settings for a Supabase project.
#[derive(Debug, Clone)]
pub struct SupabaseSettings {
    /// Project URL, e.g. `https://xyz.supabase.co`.
    pub base_url: String,
    /// Publishable (anon) API key.
    pub api_key: String,
}

/// Record source reading every row of one table.
pub struct SupabaseRecordPort {
    client: Client,
    settings: SupabaseSettings,
    table: String,
    meta: SourceMeta,
}

impl SupabaseRecordPort {
    /// Create a port reading `table`, bound to the given HTTP client.
    #[must_use]
    pub fn new(
        client: Client,
        settings: SupabaseSettings,
        table: impl Into<String>,
        meta: SourceMeta,
    ) -> Self {
        Self {
            client,
            settings,
            table: table.into(),
            meta,
        }
    }

    fn table_url(&self) -> String {
        format!(
            "{}/{REST_PATH}/{}",
            self.settings.base_url.trim_end_matches('/'),
            self.table
        )
    }

    fn request(&self) -> RequestBuilder {
        let req = self
            .client
            .get(self.table_url())
            .query(&[("select", "*")]);

        if self.settings.api_key.is_empty() {
            req
        } else {
            req.header("apikey", &self.settings.api_key)
                .bearer_auth(&self.settings.api_key)
        }
    }
}

#[async_trait]
impl RecordPort for SupabaseRecordPort {
    fn source(&self) -> &SourceMeta {
        &self.meta
    }

    async fn fetch(&self) -> Result<SourceBatch, PortError> {
        info!(table = %self.table, "fetching producer records");
        let body = fetch_json(self.request()).await?;
        let records = decode_rows(body)?;
        info!(table = %self.table, rows = records.len(), "fetched producer records");
        Ok(SourceBatch::Records(records))
    }
}

/// Build the plugin bundle for one table.
#[must_use]
pub fn plugin(
    client: Client,
    settings: SupabaseSettings,
    table: impl Into<String>,
    meta: SourceMeta,
) -> SourcePlugin {
    SourcePlugin {
        meta: meta.clone(),
        record_port: Arc::new(SupabaseRecordPort::new(client, settings, table, meta)),
    }
}

/// Turn the response body into producer records.
///
/// A row that is not a JSON object is kept as an empty record, so one bad row
/// never hides the others.
///
/// # Errors
///
/// Returns [`PortError::Internal`] when the body is not an array of rows.
pub fn decode_rows(body: Value) -> Result<Vec<ProducerRecord>, PortError> {
    let Value::Array(rows) = body else {
        return Err(PortError::Internal(
            "record store did not return an array of rows".to_owned(),
        ));
    };

    let records = rows
        .into_iter()
        .enumerate()
        .map(|(index, row)| {
            if !row.is_object() {
                warn!(index, "skipping malformed row");
                return ProducerRecord::default();
            }
            serde_json::from_value(row).unwrap_or_else(|err| {
                warn!(index, error = %err, "skipping malformed row");
                ProducerRecord::default()
            })
        })
        .collect();
    Ok(records)
}

// Small helper to fetch JSON with status handling.
async fn fetch_json(req: RequestBuilder) -> Result<Value, PortError> {
    let resp = req.send().await?;
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(PortError::Status {
            status: status.as_u16(),
            body,
        });
    }
    let bytes = resp.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tournees_core::model::{Payload, SourceId};

    use super::*;

    fn port(base_url: &str, api_key: &str) -> SupabaseRecordPort {
        SupabaseRecordPort::new(
            Client::builder()
                .no_proxy()
                .build()
                .expect("client builds"),
            SupabaseSettings {
                base_url: base_url.to_owned(),
                api_key: api_key.to_owned(),
            },
            "tournees_catl",
            SourceMeta {
                id: SourceId("catl".to_owned()),
                name: "CATL".to_owned(),
            },
        )
    }

    #[test]
    fn url_targets_rest_endpoint() {
        assert_eq!(
            port("https://demo.supabase.co/", "key").table_url(),
            "https://demo.supabase.co/rest/v1/tournees_catl"
        );
    }

    #[test]
    fn request_carries_api_key() {
        let req = port("https://demo.supabase.co", "secret")
            .request()
            .build()
            .expect("request builds");
        assert_eq!(req.url().query(), Some("select=*"));
        assert_eq!(
            req.headers().get("apikey").and_then(|value| value.to_str().ok()),
            Some("secret")
        );
        assert_eq!(
            req.headers()
                .get("authorization")
                .and_then(|value| value.to_str().ok()),
            Some("Bearer secret")
        );

        let anonymous = port("https://demo.supabase.co", "")
            .request()
            .build()
            .expect("request builds");
        assert!(anonymous.headers().get("apikey").is_none());
    }

    #[test]
    fn rows_decode_leniently() {
        let records = decode_rows(json!([
            {
                "id": 1,
                "nom_producteur": "Ferme A",
                "created_at": "2026-01-11T10:00:00+00:00",
                "data_json": "{\"tours\": []}"
            },
            { "nom_producteur": "Ferme B", "data_json": { "tours": [{}] } },
            "garbage"
        ]))
        .expect("array body");

        assert_eq!(records.len(), 3);
        let first = records.first().expect("first row");
        assert_eq!(first.producer_name(), "Ferme A");
        assert!(matches!(first.payload, Some(Payload::Text(_))));
        let second = records.get(1).expect("second row");
        assert!(matches!(second.payload, Some(Payload::Json(_))));
        let third = records.get(2).expect("third row");
        assert_eq!(third.producer_name(), "Unknown");
    }

    #[test]
    fn non_array_body_is_rejected() {
        let err = decode_rows(json!({ "message": "oops" })).expect_err("object body");
        assert!(matches!(err, PortError::Internal(_)));
    }

    #[tokio::test]
    async fn unreachable_store_is_a_connectivity_failure() {
        let err = port("http://127.0.0.1:1", "key")
            .fetch()
            .await
            .expect_err("nothing listens on port 1");
        assert!(err.is_connectivity());
    }

    /// Answer a single request with `status` and `body`, returning the base URL.
    async fn serve_once(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind local port");
        let addr = listener.local_addr().expect("local address");

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept");
            let mut request = Vec::new();
            let mut buf = [0_u8; 1024];
            while !request.windows(4).any(|window| window == b"\r\n\r\n") {
                let read = socket.read(&mut buf).await.expect("read request");
                if read == 0 {
                    break;
                }
                request.extend_from_slice(buf.get(..read).expect("read within buffer"));
            }
            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\n\
                 content-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket
                .write_all(response.as_bytes())
                .await
                .expect("write response");
        });

        format!("http://{addr}")
    }

    #[tokio::test]
    async fn error_status_is_a_connectivity_failure() {
        let base_url = serve_once("503 Service Unavailable", r#"{"message":"paused"}"#).await;

        let err = port(&base_url, "key")
            .fetch()
            .await
            .expect_err("503 is not a success");
        assert!(
            matches!(&err, PortError::Status { status: 503, body } if body.contains("paused")),
            "{err:?}"
        );
        assert!(err.is_connectivity());
    }

    #[tokio::test]
    async fn successful_fetch_returns_records() {
        let base_url = serve_once(
            "200 OK",
            r#"[{"nom_producteur":"Ferme A","data_json":{"tours":[{"day":"Lundi"}]}}]"#,
        )
        .await;

        let batch = port(&base_url, "")
            .fetch()
            .await
            .expect("store answers");
        let SourceBatch::Records(records) = batch else {
            panic!("expected raw records");
        };
        assert_eq!(records.len(), 1);
        assert_eq!(
            records.first().map(ProducerRecord::producer_name),
            Some("Ferme A")
        );
    }
}
