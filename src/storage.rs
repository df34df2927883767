use anyhow::{anyhow, Result};
use rusqlite::{params, Connection, OpenFlags};

use crate::classify::{ClassificationTally, WasteCategory};

/// One persisted item: which category was seen, when, and in which image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TallyRecord {
    /// Local ISO-8601 timestamp with seconds precision.
    pub time_stamp: String,
    pub category: WasteCategory,
    pub image_key: Option<String>,
}

pub trait TallyStore {
    /// Writes one record per counted item in `tally`. Returns rows written.
    fn record_tally(
        &mut self,
        time_stamp: &str,
        image_key: Option<&str>,
        tally: &ClassificationTally,
    ) -> Result<usize>;

    /// Totals across all stored records.
    fn totals(&self) -> Result<ClassificationTally>;

    /// Totals for records at or after `time_stamp`.
    fn totals_since(&self, time_stamp: &str) -> Result<ClassificationTally>;

    /// Most recent records, newest first.
    fn recent(&self, limit: usize) -> Result<Vec<TallyRecord>>;
}

/// Expands a tally into one record per item, in priority order.
pub fn tally_records(
    time_stamp: &str,
    image_key: Option<&str>,
    tally: &ClassificationTally,
) -> Vec<TallyRecord> {
    let mut records = Vec::with_capacity(tally.total() as usize);
    for (category, count) in tally.iter() {
        for _ in 0..count {
            records.push(TallyRecord {
                time_stamp: time_stamp.to_string(),
                category,
                image_key: image_key.map(str::to_string),
            });
        }
    }
    records
}

pub struct SqliteTallyStore {
    conn: Connection,
}

impl SqliteTallyStore {
    /// Opens (or creates) the tally database. `file:` URIs are opened as
    /// SQLite URIs, which allows shared in-memory databases in tests.
    pub fn open(db_path: &str) -> Result<Self> {
        let conn = if db_path.starts_with("file:") {
            Connection::open_with_flags(
                db_path,
                OpenFlags::SQLITE_OPEN_READ_WRITE
                    | OpenFlags::SQLITE_OPEN_CREATE
                    | OpenFlags::SQLITE_OPEN_URI,
            )?
        } else {
            Connection::open(db_path)?
        };
        let mut store = Self { conn };
        store.ensure_schema()?;
        Ok(store)
    }

    fn ensure_schema(&mut self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS waste_collection (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              time_stamp TEXT NOT NULL,
              object_id INTEGER NOT NULL,
              image_key TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_waste_collection_ts ON waste_collection(time_stamp);
            "#,
        )?;
        Ok(())
    }

    fn totals_where(&self, since: Option<&str>) -> Result<ClassificationTally> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT object_id, COUNT(*) FROM waste_collection
            WHERE ?1 IS NULL OR time_stamp >= ?1
            GROUP BY object_id
            "#,
        )?;
        let mut rows = stmt.query(params![since])?;
        let mut tally = ClassificationTally::new();
        while let Some(row) = rows.next()? {
            let object_id: i64 = row.get(0)?;
            let count: i64 = row.get(1)?;
            let category = WasteCategory::from_id(object_id)?;
            let count =
                u32::try_from(count).map_err(|_| anyhow!("tally count exceeds u32 range"))?;
            tally.add(category, count);
        }
        Ok(tally)
    }
}

impl TallyStore for SqliteTallyStore {
    fn record_tally(
        &mut self,
        time_stamp: &str,
        image_key: Option<&str>,
        tally: &ClassificationTally,
    ) -> Result<usize> {
        let records = tally_records(time_stamp, image_key, tally);
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO waste_collection (time_stamp, object_id, image_key) VALUES (?1, ?2, ?3)",
            )?;
            for record in &records {
                stmt.execute(params![
                    record.time_stamp,
                    i64::from(record.category.id()),
                    record.image_key
                ])?;
            }
        }
        tx.commit()?;
        Ok(records.len())
    }

    fn totals(&self) -> Result<ClassificationTally> {
        self.totals_where(None)
    }

    fn totals_since(&self, time_stamp: &str) -> Result<ClassificationTally> {
        self.totals_where(Some(time_stamp))
    }

    fn recent(&self, limit: usize) -> Result<Vec<TallyRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT time_stamp, object_id, image_key FROM waste_collection ORDER BY id DESC LIMIT ?1",
        )?;
        let mut rows = stmt.query(params![limit as i64])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let object_id: i64 = row.get(1)?;
            out.push(TallyRecord {
                time_stamp: row.get(0)?,
                category: WasteCategory::from_id(object_id)?,
                image_key: row.get(2)?,
            });
        }
        Ok(out)
    }
}

#[derive(Clone, Debug, Default)]
pub struct InMemoryTallyStore {
    records: Vec<TallyRecord>,
}

impl InMemoryTallyStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn totals_filtered(&self, since: Option<&str>) -> ClassificationTally {
        let mut tally = ClassificationTally::new();
        for record in &self.records {
            if since.map_or(true, |ts| record.time_stamp.as_str() >= ts) {
                tally.increment(record.category);
            }
        }
        tally
    }
}

impl TallyStore for InMemoryTallyStore {
    fn record_tally(
        &mut self,
        time_stamp: &str,
        image_key: Option<&str>,
        tally: &ClassificationTally,
    ) -> Result<usize> {
        let records = tally_records(time_stamp, image_key, tally);
        let written = records.len();
        self.records.extend(records);
        Ok(written)
    }

    fn totals(&self) -> Result<ClassificationTally> {
        Ok(self.totals_filtered(None))
    }

    fn totals_since(&self, time_stamp: &str) -> Result<ClassificationTally> {
        Ok(self.totals_filtered(Some(time_stamp)))
    }

    fn recent(&self, limit: usize) -> Result<Vec<TallyRecord>> {
        Ok(self.records.iter().rev().take(limit).cloned().collect())
    }
}
