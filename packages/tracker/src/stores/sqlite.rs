//! SQLite storage implementation.
//!
//! A file-based record store using SQLite. Good for:
//! - The single-user daily-run deployment this pipeline targets
//! - Local development
//! - Testing with persistent data
//!
//! Transition rules are enforced with guarded UPDATE statements: the legal
//! source states go in the WHERE clause, and `rows_affected` distinguishes
//! an illegal transition from a missing record. Combined with SQLite's
//! per-statement atomicity this gives per-`job_id` serialization without
//! explicit locks, and every mutation is committed before the call returns.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;

use crate::error::{Result, TrackerError};
use crate::traits::store::{RecordFilter, RecordStore};
use crate::types::{
    analysis::AnalysisResult,
    listing::RawListing,
    record::{JobRecord, JobState, Recommendation},
    run::{RunRecord, StoreStats},
};

/// SQLite-based record store.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a new SQLite store with the given connection URL.
    ///
    /// # Example URLs
    /// - `sqlite::memory:` - In-memory database (ephemeral)
    /// - `sqlite://data/jobs.db?mode=rwc` - File, created if absent
    pub async fn new(database_url: &str) -> Result<Self> {
        // `:memory:` gives each pooled connection its own database, so the
        // pool is capped at one connection for that URL.
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| TrackerError::Storage(e.to_string().into()))?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Create an in-memory SQLite store (for testing).
    pub async fn in_memory() -> Result<Self> {
        Self::new("sqlite::memory:").await
    }

    /// Run database migrations.
    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS jobs (
                job_id TEXT PRIMARY KEY,
                title TEXT NOT NULL DEFAULT '',
                company TEXT NOT NULL DEFAULT '',
                location TEXT NOT NULL DEFAULT '',
                url TEXT NOT NULL DEFAULT '',
                first_seen_at TEXT NOT NULL,
                last_seen_at TEXT NOT NULL,
                state TEXT NOT NULL DEFAULT 'new',
                score REAL,
                recommendation TEXT,
                analysis_model TEXT,
                raw_payload_ref TEXT,
                status_reason TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_jobs_state ON jobs(state);
            CREATE INDEX IF NOT EXISTS idx_jobs_first_seen ON jobs(first_seen_at);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| TrackerError::Storage(e.to_string().into()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS run_history (
                run_id TEXT PRIMARY KEY,
                started_at TEXT NOT NULL,
                scraped_count INTEGER NOT NULL DEFAULT 0,
                new_count INTEGER NOT NULL DEFAULT 0,
                analyzed_count INTEGER NOT NULL DEFAULT 0,
                exported_count INTEGER NOT NULL DEFAULT 0,
                failed_count INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_run_history_started ON run_history(started_at);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| TrackerError::Storage(e.to_string().into()))?;

        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn fetch(&self, job_id: &str) -> Result<Option<JobRecord>> {
        let row = sqlx::query_as::<_, JobRow>(
            "SELECT job_id, title, company, location, url, first_seen_at, last_seen_at, state, score, recommendation, analysis_model, raw_payload_ref, status_reason FROM jobs WHERE job_id = ?",
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| TrackerError::Storage(e.to_string().into()))?;

        match row {
            Some(r) => Ok(Some(r.into_record()?)),
            None => Ok(None),
        }
    }

    /// Translate a guarded UPDATE that touched no rows into the right error.
    async fn rejected(&self, job_id: &str, to: JobState) -> TrackerError {
        match self.fetch(job_id).await {
            Ok(Some(record)) => TrackerError::InvalidTransition {
                job_id: job_id.to_string(),
                from: record.state,
                to,
            },
            Ok(None) => TrackerError::RecordNotFound {
                job_id: job_id.to_string(),
            },
            Err(e) => e,
        }
    }
}

// Fixed-width timestamps so text ordering matches time ordering.
fn encode_time(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_time(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| TrackerError::Storage(format!("invalid timestamp {s:?}: {e}").into()))
}

// Row types for sqlx queries
#[derive(Debug, FromRow)]
struct JobRow {
    job_id: String,
    title: String,
    company: String,
    location: String,
    url: String,
    first_seen_at: String,
    last_seen_at: String,
    state: String,
    score: Option<f64>,
    recommendation: Option<String>,
    analysis_model: Option<String>,
    raw_payload_ref: Option<String>,
    status_reason: Option<String>,
}

impl JobRow {
    fn into_record(self) -> Result<JobRecord> {
        let state = JobState::parse(&self.state).ok_or_else(|| {
            TrackerError::Storage(format!("unknown state {:?}", self.state).into())
        })?;
        let recommendation = match self.recommendation.as_deref() {
            Some(code) => Some(Recommendation::parse(code).ok_or_else(|| {
                TrackerError::Storage(format!("unknown recommendation {code:?}").into())
            })?),
            None => None,
        };

        Ok(JobRecord {
            job_id: self.job_id,
            title: self.title,
            company: self.company,
            location: self.location,
            url: self.url,
            first_seen_at: decode_time(&self.first_seen_at)?,
            last_seen_at: decode_time(&self.last_seen_at)?,
            state,
            score: self.score,
            recommendation,
            analysis_model: self.analysis_model,
            raw_payload_ref: self.raw_payload_ref,
            status_reason: self.status_reason,
        })
    }
}

#[derive(Debug, FromRow)]
struct RunRow {
    run_id: String,
    started_at: String,
    scraped_count: i64,
    new_count: i64,
    analyzed_count: i64,
    exported_count: i64,
    failed_count: i64,
}

impl RunRow {
    fn into_record(self) -> Result<RunRecord> {
        Ok(RunRecord {
            run_id: self.run_id,
            started_at: decode_time(&self.started_at)?,
            scraped_count: self.scraped_count as usize,
            new_count: self.new_count as usize,
            analyzed_count: self.analyzed_count as usize,
            exported_count: self.exported_count as usize,
            failed_count: self.failed_count as usize,
        })
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn upsert_seen(
        &self,
        job_id: &str,
        seen_at: DateTime<Utc>,
        payload_ref: Option<&str>,
        listing: &RawListing,
    ) -> Result<JobRecord> {
        let seen = encode_time(seen_at);
        sqlx::query(
            r#"
            INSERT INTO jobs (job_id, title, company, location, url, first_seen_at, last_seen_at, state, raw_payload_ref)
            VALUES (?, ?, ?, ?, ?, ?, ?, 'new', ?)
            ON CONFLICT(job_id) DO UPDATE SET
                last_seen_at = MAX(jobs.last_seen_at, excluded.last_seen_at),
                raw_payload_ref = COALESCE(excluded.raw_payload_ref, jobs.raw_payload_ref)
            "#,
        )
        .bind(job_id)
        .bind(&listing.title)
        .bind(&listing.company)
        .bind(&listing.location)
        .bind(&listing.url)
        .bind(&seen)
        .bind(&seen)
        .bind(payload_ref)
        .execute(&self.pool)
        .await
        .map_err(|e| TrackerError::Storage(e.to_string().into()))?;

        self.fetch(job_id).await?.ok_or_else(|| {
            TrackerError::Storage(format!("upserted record {job_id:?} vanished").into())
        })
    }

    async fn get(&self, job_id: &str) -> Result<Option<JobRecord>> {
        self.fetch(job_id).await
    }

    async fn set_analysis(&self, job_id: &str, analysis: &AnalysisResult) -> Result<JobRecord> {
        let result = sqlx::query(
            r#"
            UPDATE jobs SET
                state = 'analyzed',
                score = ?,
                recommendation = ?,
                analysis_model = ?,
                status_reason = NULL
            WHERE job_id = ?
              AND (state IN ('new', 'analyzed', 'failed')
                   OR (state = 'exported' AND analysis_model IS NOT ?))
            "#,
        )
        .bind(analysis.score)
        .bind(analysis.recommendation.as_str())
        .bind(&analysis.model_tag)
        .bind(job_id)
        .bind(&analysis.model_tag)
        .execute(&self.pool)
        .await
        .map_err(|e| TrackerError::Storage(e.to_string().into()))?;

        if result.rows_affected() == 0 {
            return Err(self.rejected(job_id, JobState::Analyzed).await);
        }
        self.fetch(job_id).await?.ok_or_else(|| {
            TrackerError::RecordNotFound {
                job_id: job_id.to_string(),
            }
        })
    }

    async fn mark_exported(&self, job_id: &str) -> Result<JobRecord> {
        let result = sqlx::query(
            "UPDATE jobs SET state = 'exported' WHERE job_id = ? AND state = 'analyzed'",
        )
        .bind(job_id)
        .execute(&self.pool)
        .await
        .map_err(|e| TrackerError::Storage(e.to_string().into()))?;

        if result.rows_affected() == 0 {
            return Err(self.rejected(job_id, JobState::Exported).await);
        }
        self.fetch(job_id).await?.ok_or_else(|| {
            TrackerError::RecordNotFound {
                job_id: job_id.to_string(),
            }
        })
    }

    async fn mark_failed(&self, job_id: &str, reason: &str) -> Result<JobRecord> {
        let result = sqlx::query(
            "UPDATE jobs SET state = 'failed', status_reason = ? WHERE job_id = ? AND state IN ('new', 'analyzed', 'failed')",
        )
        .bind(reason)
        .bind(job_id)
        .execute(&self.pool)
        .await
        .map_err(|e| TrackerError::Storage(e.to_string().into()))?;

        if result.rows_affected() == 0 {
            return Err(self.rejected(job_id, JobState::Failed).await);
        }
        self.fetch(job_id).await?.ok_or_else(|| {
            TrackerError::RecordNotFound {
                job_id: job_id.to_string(),
            }
        })
    }

    async fn mark_skipped(&self, job_id: &str, reason: &str) -> Result<JobRecord> {
        let result = sqlx::query(
            "UPDATE jobs SET state = 'skipped', status_reason = ? WHERE job_id = ? AND state IN ('new', 'analyzed')",
        )
        .bind(reason)
        .bind(job_id)
        .execute(&self.pool)
        .await
        .map_err(|e| TrackerError::Storage(e.to_string().into()))?;

        if result.rows_affected() == 0 {
            return Err(self.rejected(job_id, JobState::Skipped).await);
        }
        self.fetch(job_id).await?.ok_or_else(|| {
            TrackerError::RecordNotFound {
                job_id: job_id.to_string(),
            }
        })
    }

    async fn query(&self, filter: &RecordFilter) -> Result<Vec<JobRecord>> {
        let mut sql = String::from(
            "SELECT job_id, title, company, location, url, first_seen_at, last_seen_at, state, score, recommendation, analysis_model, raw_payload_ref, status_reason FROM jobs WHERE 1=1",
        );
        if filter.state.is_some() {
            sql.push_str(" AND state = ?");
        }
        if filter.min_score.is_some() {
            sql.push_str(" AND score >= ?");
        }
        if filter.model_tag.is_some() {
            sql.push_str(" AND analysis_model = ?");
        }
        sql.push_str(" ORDER BY first_seen_at ASC, job_id ASC");

        let mut query = sqlx::query_as::<_, JobRow>(&sql);
        if let Some(state) = filter.state {
            query = query.bind(state.as_str());
        }
        if let Some(min_score) = filter.min_score {
            query = query.bind(min_score);
        }
        if let Some(tag) = &filter.model_tag {
            query = query.bind(tag.clone());
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| TrackerError::Storage(e.to_string().into()))?;

        rows.into_iter().map(|r| r.into_record()).collect()
    }

    async fn record_run(&self, run: &RunRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO run_history (run_id, started_at, scraped_count, new_count, analyzed_count, exported_count, failed_count)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(run_id) DO UPDATE SET
                scraped_count = excluded.scraped_count,
                new_count = excluded.new_count,
                analyzed_count = excluded.analyzed_count,
                exported_count = excluded.exported_count,
                failed_count = excluded.failed_count
            "#,
        )
        .bind(&run.run_id)
        .bind(encode_time(run.started_at))
        .bind(run.scraped_count as i64)
        .bind(run.new_count as i64)
        .bind(run.analyzed_count as i64)
        .bind(run.exported_count as i64)
        .bind(run.failed_count as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| TrackerError::Storage(e.to_string().into()))?;

        Ok(())
    }

    async fn run_history(&self, limit: usize) -> Result<Vec<RunRecord>> {
        let rows = sqlx::query_as::<_, RunRow>(
            "SELECT run_id, started_at, scraped_count, new_count, analyzed_count, exported_count, failed_count FROM run_history ORDER BY started_at DESC LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| TrackerError::Storage(e.to_string().into()))?;

        rows.into_iter().map(|r| r.into_record()).collect()
    }

    async fn stats(&self, since: DateTime<Utc>) -> Result<StoreStats> {
        let counts: Vec<(String, i64)> =
            sqlx::query_as("SELECT state, COUNT(*) FROM jobs GROUP BY state")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| TrackerError::Storage(e.to_string().into()))?;

        let mut stats = StoreStats::default();
        for (state, count) in counts {
            let count = count as usize;
            stats.total_jobs += count;
            match JobState::parse(&state) {
                Some(JobState::New) => stats.new = count,
                Some(JobState::Analyzed) => stats.analyzed = count,
                Some(JobState::Exported) => stats.exported = count,
                Some(JobState::Skipped) => stats.skipped = count,
                Some(JobState::Failed) => stats.failed = count,
                None => {
                    return Err(TrackerError::Storage(
                        format!("unknown state {state:?} in stats").into(),
                    ))
                }
            }
        }

        let cutoff = encode_time(since);
        let seen: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM jobs WHERE first_seen_at >= ?")
            .bind(&cutoff)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| TrackerError::Storage(e.to_string().into()))?;
        stats.seen_since = seen.0 as usize;

        let runs: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM run_history WHERE started_at >= ?")
                .bind(&cutoff)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| TrackerError::Storage(e.to_string().into()))?;
        stats.runs_since = runs.0 as usize;

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::record::Recommendation;

    async fn test_store() -> SqliteStore {
        SqliteStore::in_memory().await.unwrap()
    }

    fn listing(id: &str) -> RawListing {
        RawListing::new(format!("Role {id}"), format!("https://jobs.example/view/{id}"))
            .with_source_id(id)
            .with_company("Acme")
            .with_location("Lisbon")
    }

    fn analysis(score: f64, model: &str) -> AnalysisResult {
        AnalysisResult::new(score, Recommendation::Consider, model)
    }

    #[tokio::test]
    async fn test_upsert_then_refresh() {
        let store = test_store().await;
        let t0 = Utc::now();
        let t1 = t0 + chrono::Duration::hours(24);

        let created = store
            .upsert_seen("A", t0, Some("batch-0.json"), &listing("A"))
            .await
            .unwrap();
        assert_eq!(created.state, JobState::New);
        assert_eq!(created.title, "Role A");

        let refreshed = store
            .upsert_seen("A", t1, None, &listing("A"))
            .await
            .unwrap();
        assert_eq!(refreshed.first_seen_at, created.first_seen_at);
        assert!(refreshed.last_seen_at > refreshed.first_seen_at);
        // payload ref survives a sighting without one
        assert_eq!(refreshed.raw_payload_ref.as_deref(), Some("batch-0.json"));
    }

    #[tokio::test]
    async fn test_full_lifecycle() {
        let store = test_store().await;
        store
            .upsert_seen("A", Utc::now(), None, &listing("A"))
            .await
            .unwrap();

        let analyzed = store.set_analysis("A", &analysis(8.5, "m1")).await.unwrap();
        assert_eq!(analyzed.state, JobState::Analyzed);
        assert_eq!(analyzed.score, Some(8.5));
        assert_eq!(analyzed.recommendation, Some(Recommendation::Consider));

        let exported = store.mark_exported("A").await.unwrap();
        assert_eq!(exported.state, JobState::Exported);
    }

    #[tokio::test]
    async fn test_export_from_new_is_invalid() {
        let store = test_store().await;
        store
            .upsert_seen("A", Utc::now(), None, &listing("A"))
            .await
            .unwrap();

        match store.mark_exported("A").await.unwrap_err() {
            TrackerError::InvalidTransition { from, to, .. } => {
                assert_eq!(from, JobState::New);
                assert_eq!(to, JobState::Exported);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_guarded_reanalysis_of_exported() {
        let store = test_store().await;
        store
            .upsert_seen("A", Utc::now(), None, &listing("A"))
            .await
            .unwrap();
        store.set_analysis("A", &analysis(8.0, "m1")).await.unwrap();
        store.mark_exported("A").await.unwrap();

        assert!(store.set_analysis("A", &analysis(9.0, "m1")).await.is_err());

        let record = store.set_analysis("A", &analysis(6.5, "m2")).await.unwrap();
        assert_eq!(record.state, JobState::Analyzed);
        assert_eq!(record.analysis_model.as_deref(), Some("m2"));
    }

    #[tokio::test]
    async fn test_failed_records_reason_and_retries() {
        let store = test_store().await;
        store
            .upsert_seen("A", Utc::now(), None, &listing("A"))
            .await
            .unwrap();

        let failed = store.mark_failed("A", "malformed response").await.unwrap();
        assert_eq!(failed.state, JobState::Failed);
        assert_eq!(failed.status_reason.as_deref(), Some("malformed response"));

        // A retry may fail again without tripping the transition guard.
        let refailed = store.mark_failed("A", "still malformed").await.unwrap();
        assert_eq!(refailed.status_reason.as_deref(), Some("still malformed"));

        let record = store.set_analysis("A", &analysis(7.0, "m1")).await.unwrap();
        assert_eq!(record.state, JobState::Analyzed);
        assert!(record.status_reason.is_none());
    }

    #[tokio::test]
    async fn test_query_filter_and_order() {
        let store = test_store().await;
        let t0 = Utc::now();
        let t1 = t0 + chrono::Duration::minutes(1);

        store.upsert_seen("B", t0, None, &listing("B")).await.unwrap();
        store.upsert_seen("A", t0, None, &listing("A")).await.unwrap();
        store.upsert_seen("C", t1, None, &listing("C")).await.unwrap();
        store.set_analysis("A", &analysis(8.0, "m1")).await.unwrap();
        store.set_analysis("C", &analysis(9.0, "m1")).await.unwrap();

        let all = store.query(&RecordFilter::new()).await.unwrap();
        let ids: Vec<&str> = all.iter().map(|r| r.job_id.as_str()).collect();
        assert_eq!(ids, ["A", "B", "C"]);

        let analyzed = store
            .query(
                &RecordFilter::for_state(JobState::Analyzed)
                    .with_min_score(8.5)
                    .with_model_tag("m1"),
            )
            .await
            .unwrap();
        assert_eq!(analyzed.len(), 1);
        assert_eq!(analyzed[0].job_id, "C");
    }

    #[tokio::test]
    async fn test_run_history_round_trip() {
        let store = test_store().await;
        let now = Utc::now();
        for (i, id) in ["r1", "r2"].iter().enumerate() {
            store
                .record_run(&RunRecord {
                    run_id: id.to_string(),
                    started_at: now + chrono::Duration::minutes(i as i64),
                    scraped_count: 10,
                    new_count: 3,
                    analyzed_count: 3,
                    exported_count: 1,
                    failed_count: 0,
                })
                .await
                .unwrap();
        }

        let history = store.run_history(10).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].run_id, "r2");

        let stats = store.stats(now - chrono::Duration::days(1)).await.unwrap();
        assert_eq!(stats.runs_since, 2);
    }
}
