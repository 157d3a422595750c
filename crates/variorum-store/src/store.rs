//! SQLite-backed implementation of the heatmap source traits
//!
//! One [`SqliteStore`] owns one connection behind a mutex, so a single
//! instance can be shared across render worker threads.

#![allow(clippy::result_large_err)]

use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension};
use tracing::debug;
use variorum_core::model::{
    AlignedAnnotation, Alignment, DiffGroup, Note, PageBreak, Range, Revision, RevisionKind,
    SetId, Witness, WitnessId,
};
use variorum_core::sources::{
    AlignmentSource, ContentSource, HeatmapCache, NoteSource, PageBreakSource, RevisionSource,
    SetSource, TokenIndex,
};
use variorum_core::VariorumError;

use crate::errors::{corrupt_value, from_rusqlite, Result};

/// SQLite repository for witnesses, alignments, annotations, and the
/// heatmap cache
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Wrap an already-opened, already-migrated connection
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| VariorumError::Persistence {
            message: "connection lock poisoned".to_string(),
        })
    }

    // ===== Write-side helpers (seeding, import, tests) =====

    pub fn insert_witness(&self, witness: &Witness, content: &str) -> Result<()> {
        self.lock()?
            .execute(
                "INSERT INTO witnesses (id, name, content) VALUES (?1, ?2, ?3)",
                rusqlite::params![witness.id, witness.name, content],
            )
            .map_err(from_rusqlite)?;
        Ok(())
    }

    pub fn insert_set(&self, set_id: SetId, name: &str) -> Result<()> {
        self.lock()?
            .execute(
                "INSERT INTO comparison_sets (id, name) VALUES (?1, ?2)",
                rusqlite::params![set_id, name],
            )
            .map_err(from_rusqlite)?;
        Ok(())
    }

    pub fn add_set_witness(
        &self,
        set_id: SetId,
        witness_id: WitnessId,
        position: i64,
        tokenized_length: u64,
    ) -> Result<()> {
        self.lock()?
            .execute(
                "INSERT INTO set_witnesses (set_id, witness_id, position, tokenized_length)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![set_id, witness_id, position, tokenized_length as i64],
            )
            .map_err(from_rusqlite)?;
        Ok(())
    }

    pub fn insert_alignment(
        &self,
        set_id: SetId,
        alignment: &Alignment,
    ) -> Result<()> {
        let [a, b] = match alignment.annotations.as_slice() {
            [a, b] => [a, b],
            _ => {
                return Err(VariorumError::Internal {
                    message: format!(
                        "alignment {} must carry exactly two annotations",
                        alignment.id
                    ),
                })
            }
        };
        self.lock()?
            .execute(
                "INSERT INTO alignments
                    (id, set_id, diff_group,
                     a_witness_id, a_start, a_end,
                     b_witness_id, b_start, b_end)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                rusqlite::params![
                    alignment.id,
                    set_id,
                    alignment.group.as_str(),
                    a.witness_id,
                    a.range.start as i64,
                    a.range.end as i64,
                    b.witness_id,
                    b.range.start as i64,
                    b.range.end as i64,
                ],
            )
            .map_err(from_rusqlite)?;
        Ok(())
    }

    pub fn insert_token_start(&self, witness_id: WitnessId, start: u64) -> Result<()> {
        self.lock()?
            .execute(
                "INSERT OR IGNORE INTO token_starts (witness_id, start) VALUES (?1, ?2)",
                rusqlite::params![witness_id, start as i64],
            )
            .map_err(from_rusqlite)?;
        Ok(())
    }

    pub fn insert_note(&self, note: &Note) -> Result<()> {
        self.lock()?
            .execute(
                "INSERT INTO notes (id, witness_id, anchor_start, anchor_end, content)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    note.id,
                    note.witness_id,
                    note.anchor.map(|r| r.start as i64),
                    note.anchor.map(|r| r.end as i64),
                    note.content,
                ],
            )
            .map_err(from_rusqlite)?;
        Ok(())
    }

    pub fn insert_revision(&self, revision: &Revision) -> Result<()> {
        self.lock()?
            .execute(
                "INSERT INTO revisions (id, witness_id, kind, start, end)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    revision.id,
                    revision.witness_id,
                    revision.kind.as_str(),
                    revision.range.start as i64,
                    revision.range.end as i64,
                ],
            )
            .map_err(from_rusqlite)?;
        Ok(())
    }

    pub fn insert_page_break(&self, page_break: &PageBreak) -> Result<()> {
        self.lock()?
            .execute(
                "INSERT INTO page_breaks (id, witness_id, position, label)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![
                    page_break.id,
                    page_break.witness_id,
                    page_break.position as i64,
                    page_break.label,
                ],
            )
            .map_err(from_rusqlite)?;
        Ok(())
    }

    /// Update the cached tokenized length after a (re-)collation
    pub fn set_tokenized_length(
        &self,
        set_id: SetId,
        witness_id: WitnessId,
        length: u64,
    ) -> Result<()> {
        self.lock()?
            .execute(
                "UPDATE set_witnesses SET tokenized_length = ?3
                 WHERE set_id = ?1 AND witness_id = ?2",
                rusqlite::params![set_id, witness_id, length as i64],
            )
            .map_err(from_rusqlite)?;
        Ok(())
    }
}

impl SetSource for SqliteStore {
    fn witnesses(&self, set_id: SetId) -> Result<Vec<Witness>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT w.id, w.name FROM witnesses w
                 JOIN set_witnesses sw ON sw.witness_id = w.id
                 WHERE sw.set_id = ?1
                 ORDER BY sw.position",
            )
            .map_err(from_rusqlite)?;
        let rows = stmt
            .query_map([set_id], |row| {
                Ok(Witness::new(row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;
        Ok(rows)
    }

    fn tokenized_length(&self, set_id: SetId, witness_id: WitnessId) -> Result<u64> {
        let conn = self.lock()?;
        let length: Option<i64> = conn
            .query_row(
                "SELECT tokenized_length FROM set_witnesses
                 WHERE set_id = ?1 AND witness_id = ?2",
                rusqlite::params![set_id, witness_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(from_rusqlite)?;
        match length {
            Some(len) => Ok(len.max(0) as u64),
            None => Err(VariorumError::WitnessNotFound { witness_id }),
        }
    }
}

impl AlignmentSource for SqliteStore {
    /// Fetch one page of alignments for a (base, witness) pair, ordered by
    /// the base-side range so the fold sees them in text order. Rows are
    /// stored undirected; the base may sit on either side.
    fn pair_alignments(
        &self,
        set_id: SetId,
        base_id: WitnessId,
        witness_id: WitnessId,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Alignment>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, diff_group,
                        a_witness_id, a_start, a_end,
                        b_witness_id, b_start, b_end
                 FROM alignments
                 WHERE set_id = ?1
                   AND ((a_witness_id = ?2 AND b_witness_id = ?3)
                     OR (a_witness_id = ?3 AND b_witness_id = ?2))
                 ORDER BY CASE WHEN a_witness_id = ?2 THEN a_start ELSE b_start END,
                          CASE WHEN a_witness_id = ?2 THEN a_end ELSE b_end END,
                          id
                 LIMIT ?4 OFFSET ?5",
            )
            .map_err(from_rusqlite)?;
        let rows = stmt
            .query_map(
                rusqlite::params![set_id, base_id, witness_id, limit as i64, offset as i64],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, i64>(4)?,
                        row.get::<_, i64>(5)?,
                        row.get::<_, i64>(6)?,
                        row.get::<_, i64>(7)?,
                    ))
                },
            )
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;

        let mut alignments = Vec::with_capacity(rows.len());
        for (id, group, a_wit, a_start, a_end, b_wit, b_start, b_end) in rows {
            let group = DiffGroup::parse(&group)
                .ok_or_else(|| corrupt_value("diff_group", &group))?;
            alignments.push(Alignment::new(
                id,
                group,
                vec![
                    AlignedAnnotation::new(a_wit, Range::new(a_start as u64, a_end as u64)),
                    AlignedAnnotation::new(b_wit, Range::new(b_start as u64, b_end as u64)),
                ],
            ));
        }
        debug!(
            set = set_id,
            base = base_id,
            witness = witness_id,
            offset,
            count = alignments.len(),
            "fetched alignment batch"
        );
        Ok(alignments)
    }
}

impl TokenIndex for SqliteStore {
    fn next_token_start(&self, witness_id: WitnessId, offset: u64) -> Result<u64> {
        let conn = self.lock()?;
        let next: Option<i64> = conn
            .query_row(
                "SELECT MIN(start) FROM token_starts
                 WHERE witness_id = ?1 AND start >= ?2",
                rusqlite::params![witness_id, offset as i64],
                |row| row.get(0),
            )
            .optional()
            .map_err(from_rusqlite)?
            .flatten();
        // no boundary at or after the offset: fall back to the offset itself
        Ok(next.map(|n| n as u64).unwrap_or(offset))
    }
}

impl ContentSource for SqliteStore {
    fn content(&self, witness_id: WitnessId) -> Result<String> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT content FROM witnesses WHERE id = ?1",
            [witness_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(from_rusqlite)?
        .ok_or(VariorumError::WitnessNotFound { witness_id })
    }
}

impl NoteSource for SqliteStore {
    fn notes(&self, witness_id: WitnessId) -> Result<Vec<Note>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, anchor_start, anchor_end, content FROM notes
                 WHERE witness_id = ?1
                 ORDER BY anchor_start IS NULL, anchor_start, id",
            )
            .map_err(from_rusqlite)?;
        let rows = stmt
            .query_map([witness_id], |row| {
                let start: Option<i64> = row.get(1)?;
                let end: Option<i64> = row.get(2)?;
                let anchor = match (start, end) {
                    (Some(s), Some(e)) => Some(Range::new(s as u64, e as u64)),
                    _ => None,
                };
                Ok(Note::new(
                    row.get::<_, i64>(0)?,
                    witness_id,
                    anchor,
                    row.get::<_, String>(3)?,
                ))
            })
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;
        Ok(rows)
    }
}

impl RevisionSource for SqliteStore {
    fn revisions(&self, witness_id: WitnessId) -> Result<Vec<Revision>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, kind, start, end FROM revisions
                 WHERE witness_id = ?1 ORDER BY start, id",
            )
            .map_err(from_rusqlite)?;
        let rows = stmt
            .query_map([witness_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            })
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;

        let mut revisions = Vec::with_capacity(rows.len());
        for (id, kind, start, end) in rows {
            let kind =
                RevisionKind::parse(&kind).ok_or_else(|| corrupt_value("kind", &kind))?;
            revisions.push(Revision::new(
                id,
                witness_id,
                kind,
                Range::new(start as u64, end as u64),
            ));
        }
        Ok(revisions)
    }
}

impl PageBreakSource for SqliteStore {
    fn page_breaks(&self, witness_id: WitnessId) -> Result<Vec<PageBreak>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, position, label FROM page_breaks
                 WHERE witness_id = ?1 ORDER BY position, id",
            )
            .map_err(from_rusqlite)?;
        let rows = stmt
            .query_map([witness_id], |row| {
                Ok(PageBreak::new(
                    row.get::<_, i64>(0)?,
                    witness_id,
                    row.get::<_, i64>(1)? as u64,
                    row.get::<_, Option<String>>(2)?,
                ))
            })
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;
        Ok(rows)
    }
}

impl HeatmapCache for SqliteStore {
    fn exists(&self, set_id: SetId, key: &str, condensed: bool) -> Result<bool> {
        let conn = self.lock()?;
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM heatmap_cache
                 WHERE set_id = ?1 AND vis_key = ?2 AND condensed = ?3",
                rusqlite::params![set_id, key, condensed as i64],
                |row| row.get(0),
            )
            .optional()
            .map_err(from_rusqlite)?;
        Ok(found.is_some())
    }

    fn read(&self, set_id: SetId, key: &str, condensed: bool) -> Result<Option<String>> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT content FROM heatmap_cache
             WHERE set_id = ?1 AND vis_key = ?2 AND condensed = ?3",
            rusqlite::params![set_id, key, condensed as i64],
            |row| row.get(0),
        )
        .optional()
        .map_err(from_rusqlite)
    }

    fn write(&self, set_id: SetId, key: &str, condensed: bool, content: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        self.lock()?
            .execute(
                "INSERT INTO heatmap_cache (set_id, vis_key, condensed, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(set_id, vis_key, condensed) DO UPDATE SET
                    content = excluded.content,
                    created_at = excluded.created_at",
                rusqlite::params![set_id, key, condensed as i64, content, now],
            )
            .map_err(from_rusqlite)?;
        Ok(())
    }

    fn delete_all(&self, set_id: SetId) -> Result<()> {
        let deleted = self
            .lock()?
            .execute("DELETE FROM heatmap_cache WHERE set_id = ?1", [set_id])
            .map_err(from_rusqlite)?;
        debug!(set = set_id, deleted, "cleared heatmap cache");
        Ok(())
    }
}
