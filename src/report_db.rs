use crate::error::{PushError, error_message};
use crate::response::RecoveredDocument;
use rusqlite::{Connection, OptionalExtension, Result as SqliteResult, params};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::info;

pub struct ReportStore {
    conn: Connection,
}

#[derive(Debug)]
pub struct StoredReport {
    pub uid: String,
    pub company_slug: String,
    pub report_date: String,
    pub payload: RecoveredDocument,
    pub created_at: String,
    pub updated_at: String,
}

/// Result of pushing one reviewed extraction.
#[derive(Debug, PartialEq, Eq)]
pub struct PushOutcome {
    pub record_id: String,
    /// An earlier record for the same company and date was overwritten.
    pub updated: bool,
    pub message: String,
}

impl ReportStore {
    /// Open (or create) the report store with SQLite backend
    pub fn new<P: AsRef<Path>>(db_path: P) -> SqliteResult<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CANTOPEN),
                    Some(format!("cannot create {}: {e}", parent.display())),
                )
            })?;
        }
        Self::from_connection(Connection::open(db_path)?)
    }

    #[cfg(test)]
    pub fn in_memory() -> SqliteResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> SqliteResult<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS reports (
                uid TEXT PRIMARY KEY,
                company_slug TEXT NOT NULL,
                report_date TEXT NOT NULL,
                payload TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_reports_company ON reports(company_slug)",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_reports_date ON reports(report_date)",
            [],
        )?;

        info!("Database initialized successfully");
        Ok(Self { conn })
    }

    /// Generate a unique ID from company slug and report date
    pub fn generate_uid(company_slug: &str, report_date: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(company_slug.as_bytes());
        hasher.update(b"\0");
        hasher.update(report_date.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// The stored report for this company and date, if any.
    pub fn find_duplicate(
        &self,
        company_slug: &str,
        report_date: &str,
    ) -> SqliteResult<Option<StoredReport>> {
        self.get_report(&Self::generate_uid(company_slug, report_date))
    }

    /// Insert or update the reviewed document for `company_slug`.
    ///
    /// The document must carry a string `date`; error documents are refused.
    pub fn push_report(
        &self,
        company_slug: &str,
        doc: &RecoveredDocument,
    ) -> Result<PushOutcome, PushError> {
        if let Some(message) = error_message(doc) {
            return Err(PushError::FailedExtraction(message.to_string()));
        }

        let report_date = doc
            .get("date")
            .and_then(Value::as_str)
            .filter(|d| !d.trim().is_empty())
            .ok_or(PushError::MissingDate)?;

        let uid = Self::generate_uid(company_slug, report_date);
        let updated = self.find_duplicate(company_slug, report_date)?.is_some();
        let payload = serde_json::to_string(doc)?;

        self.conn.execute(
            "INSERT INTO reports (uid, company_slug, report_date, payload)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(uid) DO UPDATE SET
                payload = excluded.payload,
                updated_at = CURRENT_TIMESTAMP",
            params![uid, company_slug, report_date, payload],
        )?;

        let message = if updated {
            format!("Updated {company_slug} metrics for {report_date}")
        } else {
            format!("Pushed {company_slug} metrics for {report_date}")
        };
        info!(uid = %uid, company = company_slug, date = report_date, updated, "Report stored");

        Ok(PushOutcome {
            record_id: uid,
            updated,
            message,
        })
    }

    /// Get report by UID
    pub fn get_report(&self, uid: &str) -> SqliteResult<Option<StoredReport>> {
        self.conn
            .query_row(
                "SELECT uid, company_slug, report_date, payload, created_at, updated_at
                 FROM reports
                 WHERE uid = ?1",
                params![uid],
                Self::row_to_report,
            )
            .optional()
    }

    /// All stored reports for one company, newest report date first.
    pub fn reports_for_company(&self, company_slug: &str) -> SqliteResult<Vec<StoredReport>> {
        let mut stmt = self.conn.prepare(
            "SELECT uid, company_slug, report_date, payload, created_at, updated_at
             FROM reports
             WHERE company_slug = ?1
             ORDER BY report_date DESC",
        )?;
        let rows = stmt.query_map(params![company_slug], Self::row_to_report)?;
        rows.collect()
    }

    /// Helper: map a row with the 6-column report projection to `StoredReport`.
    fn row_to_report(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredReport> {
        let payload: String = row.get(3)?;
        let payload = serde_json::from_str(&payload).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })?;
        Ok(StoredReport {
            uid: row.get(0)?,
            company_slug: row.get(1)?,
            report_date: row.get(2)?,
            payload,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }

    /// Count of stored reports, total and distinct companies
    pub fn count_reports(&self) -> SqliteResult<(usize, usize)> {
        let total: usize = self
            .conn
            .query_row("SELECT COUNT(*) FROM reports", [], |row| row.get(0))?;
        let companies: usize = self.conn.query_row(
            "SELECT COUNT(DISTINCT company_slug) FROM reports",
            [],
            |row| row.get(0),
        )?;
        Ok((total, companies))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::error_document;
    use serde_json::json;

    fn grab_doc(revenue: u64) -> RecoveredDocument {
        json!({"company_slug": "grab-com", "date": "2024-06-30", "group_revenue": revenue})
            .as_object()
            .cloned()
            .unwrap()
    }

    #[test]
    fn test_uid_generation() {
        let uid1 = ReportStore::generate_uid("grab-com", "2024-06-30");
        let uid2 = ReportStore::generate_uid("grab-com", "2024-06-30");
        let uid3 = ReportStore::generate_uid("grab-com", "2024-09-30");

        assert_eq!(uid1, uid2); // Same inputs = same hash
        assert_ne!(uid1, uid3); // Different inputs = different hash
        assert_ne!(
            ReportStore::generate_uid("ab", "c"),
            ReportStore::generate_uid("a", "bc")
        );
    }

    #[test]
    fn test_push_then_update() {
        let db = ReportStore::in_memory().unwrap();

        let first = db.push_report("grab-com", &grab_doc(819)).unwrap();
        assert!(!first.updated);
        assert_eq!(first.message, "Pushed grab-com metrics for 2024-06-30");

        let dup = db.find_duplicate("grab-com", "2024-06-30").unwrap().unwrap();
        assert_eq!(dup.payload["group_revenue"], json!(819));

        let second = db.push_report("grab-com", &grab_doc(820)).unwrap();
        assert!(second.updated);
        assert_eq!(second.record_id, first.record_id);

        let stored = db.get_report(&first.record_id).unwrap().unwrap();
        assert_eq!(stored.payload["group_revenue"], json!(820));
        assert_eq!(db.count_reports().unwrap(), (1, 1));
        assert_eq!(db.reports_for_company("grab-com").unwrap().len(), 1);
    }

    #[test]
    fn test_push_refuses_error_and_undated_documents() {
        let db = ReportStore::in_memory().unwrap();

        let err = db
            .push_report("grab-com", &error_document("Invalid JSON response from LLM"))
            .unwrap_err();
        assert!(matches!(err, PushError::FailedExtraction(_)));

        let undated = json!({"company_slug": "grab-com"}).as_object().cloned().unwrap();
        assert!(matches!(
            db.push_report("grab-com", &undated),
            Err(PushError::MissingDate)
        ));
        assert_eq!(db.count_reports().unwrap(), (0, 0));
    }

    #[test]
    fn test_file_backed_store_creates_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store").join("reports.db");
        let db = ReportStore::new(&path).unwrap();
        db.push_report("grab-com", &grab_doc(1)).unwrap();
        assert!(path.exists());
    }
}
