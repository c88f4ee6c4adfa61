use rusqlite::{Connection, OptionalExtension, Result, params};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::migrations;

/// A prior fetch within this many seconds of now is reused instead of
/// fetching again.
pub const RECENT_FETCH_WINDOW_SECS: i64 = 5 * 60;

/// Rows older than this are excluded from the per-domain average duration.
pub const AVERAGE_FETCH_PERIOD_SECS: i64 = 24 * 60 * 60;

pub struct Database {
    conn: Connection,
}

/// Interned name tables. Each maps a unique name string to a stable id,
/// created lazily on first encounter and never updated or deleted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EntityKind {
    Domain,
    Url,
    Element,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Domain => "domain",
            EntityKind::Url => "url",
            EntityKind::Element => "element",
        }
    }
}

/// A reusable prior fetch of the same (url, element) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentFetch {
    pub fetch_time: i64,
    pub duration_ms: i64,
    pub count: i64,
}

/// Aggregates computed fresh for every response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralStatistics {
    /// Distinct URLs ever fetched for the domain.
    pub url_count_for_domain: i64,
    /// Average fetch duration (ms) for the domain over the last 24 hours,
    /// rounded; 0 when no fetches qualify.
    pub average_fetch_time_for_domain: i64,
    /// Sum of counts for the (domain, element) pair.
    pub total_element_count_for_domain: i64,
    /// Sum of counts for the element across all domains.
    pub total_element_count: i64,
}

fn current_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

impl Database {
    pub fn drop(path: &Path) {
        fs::remove_file(path).unwrap();
    }

    pub fn exists(path: &Path) -> bool {
        path.exists()
    }

    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // Optimize for concurrent writes
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            PRAGMA foreign_keys = ON;
            ",
        )?;

        migrations::run_migrations(&conn)?;

        Ok(Database { conn })
    }

    // Entity interning

    /// Returns the id for a name, inserting it first if it has never been
    /// seen. The insert-or-ignore against the unique name column makes
    /// concurrent first encounters of the same name converge on one row.
    pub fn intern_entity(&self, kind: EntityKind, name: &str) -> Result<i64> {
        self.conn.execute(
            &format!(
                "INSERT OR IGNORE INTO {} (name) VALUES (?1)",
                kind.as_str()
            ),
            params![name],
        )?;

        self.conn.query_row(
            &format!("SELECT id FROM {} WHERE name = ?1", kind.as_str()),
            params![name],
            |row| row.get(0),
        )
    }

    /// Id lookup without insertion. Dedup checks and statistics must not
    /// create name rows as a side effect.
    pub fn find_entity(&self, kind: EntityKind, name: &str) -> Result<Option<i64>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT id FROM {} WHERE name = ?1", kind.as_str()))?;

        let result = stmt.query_row(params![name], |row| row.get(0)).optional()?;
        Ok(result)
    }

    // Request rows

    /// Appends one fact row, interning the three names first.
    pub fn insert_request(
        &self,
        domain: &str,
        url: &str,
        element: &str,
        fetch_time: i64,
        duration_ms: i64,
        count: i64,
    ) -> Result<i64> {
        let domain_id = self.intern_entity(EntityKind::Domain, domain)?;
        let url_id = self.intern_entity(EntityKind::Url, url)?;
        let element_id = self.intern_entity(EntityKind::Element, element)?;

        self.conn.execute(
            "INSERT INTO request (domain_id, url_id, element_id, fetch_time, duration_ms, count)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![domain_id, url_id, element_id, fetch_time, duration_ms, count],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    /// Most recent request for the exact (url, element) pair within the
    /// recency window. Unknown names short-circuit to None.
    pub fn find_recent_fetch(&self, url: &str, element: &str) -> Result<Option<RecentFetch>> {
        let url_id = self.find_entity(EntityKind::Url, url)?;
        let element_id = self.find_entity(EntityKind::Element, element)?;

        let (Some(url_id), Some(element_id)) = (url_id, element_id) else {
            return Ok(None);
        };

        let cutoff = current_timestamp() - RECENT_FETCH_WINDOW_SECS;

        let mut stmt = self.conn.prepare(
            "SELECT fetch_time, duration_ms, count FROM request
             WHERE url_id = ?1 AND element_id = ?2 AND fetch_time >= ?3
             ORDER BY fetch_time DESC LIMIT 1",
        )?;

        let result = stmt
            .query_row(params![url_id, element_id, cutoff], |row| {
                Ok(RecentFetch {
                    fetch_time: row.get(0)?,
                    duration_ms: row.get(1)?,
                    count: row.get(2)?,
                })
            })
            .optional()?;

        Ok(result)
    }

    // Statistics

    pub fn general_statistics(&self, domain: &str, element: &str) -> Result<GeneralStatistics> {
        let domain_id = self.find_entity(EntityKind::Domain, domain)?;
        let element_id = self.find_entity(EntityKind::Element, element)?;

        Ok(GeneralStatistics {
            url_count_for_domain: match domain_id {
                Some(id) => self.url_count_for_domain(id)?,
                None => 0,
            },
            average_fetch_time_for_domain: match domain_id {
                Some(id) => self.average_fetch_time_for_domain(id)?,
                None => 0,
            },
            total_element_count_for_domain: match (domain_id, element_id) {
                (Some(domain_id), Some(element_id)) => {
                    self.total_element_count_for_domain(domain_id, element_id)?
                }
                _ => 0,
            },
            total_element_count: match element_id {
                Some(id) => self.total_element_count(id)?,
                None => 0,
            },
        })
    }

    fn url_count_for_domain(&self, domain_id: i64) -> Result<i64> {
        self.conn.query_row(
            "SELECT COUNT(DISTINCT url_id) FROM request WHERE domain_id = ?1",
            params![domain_id],
            |row| row.get(0),
        )
    }

    fn average_fetch_time_for_domain(&self, domain_id: i64) -> Result<i64> {
        let cutoff = current_timestamp() - AVERAGE_FETCH_PERIOD_SECS;

        let average: Option<f64> = self.conn.query_row(
            "SELECT AVG(duration_ms) FROM request WHERE domain_id = ?1 AND fetch_time >= ?2",
            params![domain_id, cutoff],
            |row| row.get(0),
        )?;

        Ok(average.map(|avg| avg.round() as i64).unwrap_or(0))
    }

    fn total_element_count_for_domain(&self, domain_id: i64, element_id: i64) -> Result<i64> {
        self.conn.query_row(
            "SELECT COALESCE(SUM(count), 0) FROM request
             WHERE domain_id = ?1 AND element_id = ?2",
            params![domain_id, element_id],
            |row| row.get(0),
        )
    }

    fn total_element_count(&self, element_id: i64) -> Result<i64> {
        self.conn.query_row(
            "SELECT COALESCE(SUM(count), 0) FROM request WHERE element_id = ?1",
            params![element_id],
            |row| row.get(0),
        )
    }

    // Migration bookkeeping

    pub fn applied_migrations(&self) -> Result<Vec<String>> {
        migrations::applied_migrations(&self.conn)
    }

    pub fn get_connection(&self) -> &Connection {
        &self.conn
    }
}
