//! Response snapshot storage.
//!
//! Entries are keyed by request identity within a generation. Writes use
//! UPSERT semantics, so the last write for a key wins.

use super::connection::CacheDb;
use super::hash::compute_cache_key;
use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tokio_rusqlite::rusqlite::{self, OptionalExtension};
use tokio_rusqlite::params;

/// Classification of a response, mirroring the fetch response types.
///
/// Only `Basic` responses are eligible for write-back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// Same-origin response with readable status, headers and body.
    Basic,
    /// Cross-origin response obtained with CORS (e.g. after a redirect).
    Cors,
    /// Cross-origin response whose contents are not inspectable.
    Opaque,
    /// Synthesized network error.
    Error,
}

impl ResponseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseType::Basic => "basic",
            ResponseType::Cors => "cors",
            ResponseType::Opaque => "opaque",
            ResponseType::Error => "error",
        }
    }
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResponseType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(ResponseType::Basic),
            "cors" => Ok(ResponseType::Cors),
            "opaque" => Ok(ResponseType::Opaque),
            "error" => Ok(ResponseType::Error),
            other => Err(Error::CorruptEntry(format!("unknown response type: {other}"))),
        }
    }
}

/// Immutable copy of a response captured at write time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseSnapshot {
    /// URL the response was served from.
    pub url: String,
    pub status: u16,
    /// Header pairs in received order.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub response_type: ResponseType,
}

impl ResponseSnapshot {
    /// Case-insensitive header lookup returning the first match.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }
}

/// A snapshot together with the request identity it is stored under.
#[derive(Debug, Clone)]
pub struct StoredEntry {
    pub key_hash: String,
    pub method: String,
    pub request_url: String,
    pub snapshot: ResponseSnapshot,
    pub stored_at: String,
}

impl StoredEntry {
    /// Build an entry for a request, deriving its key.
    pub fn new(method: &str, request_url: &str, snapshot: ResponseSnapshot) -> Self {
        Self {
            key_hash: compute_cache_key(method, request_url, ""),
            method: method.to_ascii_uppercase(),
            request_url: request_url.to_string(),
            snapshot,
            stored_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

fn ensure_generation(conn: &rusqlite::Connection, generation: &str) -> Result<(), Error> {
    conn.execute(
        "INSERT OR IGNORE INTO generations (name, created_at) VALUES (?1, ?2)",
        params![generation, chrono::Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

fn upsert(conn: &rusqlite::Connection, generation: &str, entry: &StoredEntry) -> Result<(), Error> {
    let headers_json = serde_json::to_string(&entry.snapshot.headers)?;
    conn.execute(
        "INSERT INTO entries (
            generation, key_hash, method, request_url, response_url, status,
            response_type, headers_json, body, stored_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        ON CONFLICT(generation, key_hash) DO UPDATE SET
            method = excluded.method,
            request_url = excluded.request_url,
            response_url = excluded.response_url,
            status = excluded.status,
            response_type = excluded.response_type,
            headers_json = excluded.headers_json,
            body = excluded.body,
            stored_at = excluded.stored_at",
        params![
            generation,
            &entry.key_hash,
            &entry.method,
            &entry.request_url,
            &entry.snapshot.url,
            entry.snapshot.status as i64,
            entry.snapshot.response_type.as_str(),
            headers_json,
            &entry.snapshot.body,
            &entry.stored_at,
        ],
    )?;
    Ok(())
}

impl CacheDb {
    /// Store one entry, creating the generation if needed.
    pub async fn put_entry(&self, generation: &str, entry: &StoredEntry) -> Result<(), Error> {
        self.put_entries(generation, vec![entry.clone()]).await
    }

    /// Store a batch of entries atomically.
    ///
    /// The generation is created in the same transaction, so a failed batch
    /// leaves no trace of a new generation.
    pub async fn put_entries(&self, generation: &str, entries: Vec<StoredEntry>) -> Result<(), Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                ensure_generation(&tx, &generation)?;
                for entry in &entries {
                    upsert(&tx, &generation, entry)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up a snapshot by request key.
    ///
    /// Returns None if the generation has no entry for that key.
    pub async fn match_entry(&self, generation: &str, key_hash: &str) -> Result<Option<ResponseSnapshot>, Error> {
        let generation = generation.to_string();
        let key_hash = key_hash.to_string();
        self.conn
            .call(move |conn| -> Result<Option<ResponseSnapshot>, Error> {
                let row = conn
                    .query_row(
                        "SELECT response_url, status, response_type, headers_json, body
                         FROM entries WHERE generation = ?1 AND key_hash = ?2",
                        params![generation, key_hash],
                        |row| {
                            Ok((
                                row.get::<_, String>(0)?,
                                row.get::<_, i64>(1)?,
                                row.get::<_, String>(2)?,
                                row.get::<_, String>(3)?,
                                row.get::<_, Vec<u8>>(4)?,
                            ))
                        },
                    )
                    .optional()?;

                let Some((url, status, response_type, headers_json, body)) = row else {
                    return Ok(None);
                };

                let status = u16::try_from(status).map_err(|_| Error::CorruptEntry(format!("status {status}")))?;
                Ok(Some(ResponseSnapshot {
                    url,
                    status,
                    headers: serde_json::from_str(&headers_json)?,
                    body,
                    response_type: response_type.parse()?,
                }))
            })
            .await
            .map_err(Error::from)
    }

    /// Request URLs stored in a generation, in key order.
    pub async fn entry_urls(&self, generation: &str) -> Result<Vec<String>, Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt =
                    conn.prepare("SELECT request_url FROM entries WHERE generation = ?1 ORDER BY request_url ASC")?;
                let urls = stmt
                    .query_map(params![generation], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(urls)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_snapshot(url: &str, body: &[u8]) -> ResponseSnapshot {
        ResponseSnapshot {
            url: url.to_string(),
            status: 200,
            headers: vec![
                ("Content-Type".to_string(), "text/css".to_string()),
                ("Cache-Control".to_string(), "max-age=60".to_string()),
            ],
            body: body.to_vec(),
            response_type: ResponseType::Basic,
        }
    }

    #[tokio::test]
    async fn test_put_and_match_round_trip() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let url = "http://localhost:4000/app.css";
        let snapshot = make_snapshot(url, b"body { margin: 0 }\x00\xff");
        let entry = StoredEntry::new("GET", url, snapshot.clone());

        db.put_entry("v1", &entry).await.unwrap();

        let found = db.match_entry("v1", &entry.key_hash).await.unwrap().unwrap();
        assert_eq!(found, snapshot);
        assert_eq!(found.content_type(), Some("text/css"));
    }

    #[tokio::test]
    async fn test_match_missing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.create_generation("v1").await.unwrap();
        let result = db.match_entry("v1", "nonexistent").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_match_is_scoped_to_generation() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let url = "http://localhost:4000/app.js";
        let entry = StoredEntry::new("GET", url, make_snapshot(url, b"1"));
        db.put_entry("v1", &entry).await.unwrap();
        db.create_generation("v2").await.unwrap();

        assert!(db.match_entry("v2", &entry.key_hash).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let url = "http://localhost:4000/app.js";
        db.put_entry("v1", &StoredEntry::new("GET", url, make_snapshot(url, b"old")))
            .await
            .unwrap();
        let newer = StoredEntry::new("GET", url, make_snapshot(url, b"new"));
        db.put_entry("v1", &newer).await.unwrap();

        assert_eq!(db.generation_len("v1").await.unwrap(), 1);
        let found = db.match_entry("v1", &newer.key_hash).await.unwrap().unwrap();
        assert_eq!(found.body, b"new");
    }

    #[tokio::test]
    async fn test_put_entries_creates_generation() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let entries = vec![
            StoredEntry::new("GET", "http://localhost:4000/", make_snapshot("http://localhost:4000/", b"<html>")),
            StoredEntry::new(
                "GET",
                "http://localhost:4000/manifest.json",
                make_snapshot("http://localhost:4000/manifest.json", b"{}"),
            ),
        ];

        db.put_entries("v1", entries).await.unwrap();

        assert!(db.has_generation("v1").await.unwrap());
        assert_eq!(
            db.entry_urls("v1").await.unwrap(),
            vec!["http://localhost:4000/".to_string(), "http://localhost:4000/manifest.json".to_string()]
        );
    }

    #[tokio::test]
    async fn test_delete_generation_cascades_entries() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let url = "http://localhost:4000/logo.png";
        let entry = StoredEntry::new("GET", url, make_snapshot(url, b"png"));
        db.put_entry("v1", &entry).await.unwrap();

        db.delete_generation("v1").await.unwrap();

        assert_eq!(db.generation_len("v1").await.unwrap(), 0);
        assert!(db.match_entry("v1", &entry.key_hash).await.unwrap().is_none());
    }

    #[test]
    fn test_response_type_parse() {
        assert_eq!("basic".parse::<ResponseType>().unwrap(), ResponseType::Basic);
        assert_eq!(ResponseType::Opaque.to_string(), "opaque");
        assert!("weird".parse::<ResponseType>().is_err());
    }

    #[test]
    fn test_header_lookup_case_insensitive() {
        let snapshot = make_snapshot("http://localhost:4000/a.css", b"");
        assert_eq!(snapshot.header("cache-control"), Some("max-age=60"));
        assert_eq!(snapshot.header("etag"), None);
    }
}
