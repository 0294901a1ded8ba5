use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info};

use crate::database::schema::SCHEMA;
use crate::model::list_field::{decode_list, encode_list, validate_item};
use crate::model::{Store, Tag, VisitationStatus};

const STORE_COLUMNS: &str = "id, name, visitation_status, visit_date, selected_tag, memo,
     business_hours, phone_number, address, file_name";

pub struct StoreRepository {
    conn: Connection,
}

impl StoreRepository {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database {:?}", path))?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA).context("Failed to initialize schema")?;
        Ok(Self { conn })
    }

    /// Listing query of the home screen: one status, newest visit first.
    pub fn fetch_stores(&self, status: VisitationStatus) -> Result<Vec<Store>> {
        let sql = format!(
            "SELECT {STORE_COLUMNS} FROM stores
             WHERE visitation_status = ?1
             ORDER BY visit_date IS NULL, visit_date DESC, id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![status.raw()], store_from_row)?;
        let stores = rows
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to fetch stores")?;
        debug!("Fetched {} {} stores", stores.len(), status);
        Ok(stores)
    }

    pub fn fetch_all_stores(&self) -> Result<Vec<Store>> {
        let sql = format!(
            "SELECT {STORE_COLUMNS} FROM stores ORDER BY visit_date IS NULL, visit_date DESC, id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], store_from_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to fetch stores")
    }

    pub fn fetch_store(&self, id: i64) -> Result<Option<Store>> {
        let sql = format!("SELECT {STORE_COLUMNS} FROM stores WHERE id = ?1");
        self.conn
            .query_row(&sql, params![id], store_from_row)
            .optional()
            .with_context(|| format!("Failed to fetch store {}", id))
    }

    pub fn fetch_by_name(&self, name: &str) -> Result<Option<Store>> {
        let sql = format!("SELECT {STORE_COLUMNS} FROM stores WHERE name = ?1 ORDER BY id LIMIT 1");
        self.conn
            .query_row(&sql, params![name], store_from_row)
            .optional()
            .with_context(|| format!("Failed to fetch store named '{}'", name))
    }

    /// Registration path: updates the row carrying the same name, or creates one.
    pub fn upsert_by_name(&self, store: &Store) -> Result<i64> {
        match self.fetch_by_name(&store.name)? {
            Some(existing) => {
                let id = existing.id.context("Stored row without id")?;
                let mut updated = store.clone();
                updated.id = Some(id);
                self.update_store(&updated)?;
                info!("Updated existing store '{}' ({})", store.name, id);
                Ok(id)
            }
            None => self.insert_store(store),
        }
    }

    pub fn insert_store(&self, store: &Store) -> Result<i64> {
        let tags = encode_list(&store.selected_tags)?;
        let files = encode_list(&store.file_names)?;
        self.conn
            .execute(
                "INSERT INTO stores (name, visitation_status, visit_date, selected_tag, memo,
                                     business_hours, phone_number, address, file_name)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    store.name,
                    store.visitation_status.raw(),
                    store.visit_date,
                    tags,
                    store.memo,
                    store.business_hours,
                    store.phone_number,
                    store.address,
                    files
                ],
            )
            .context("Failed to insert store")?;
        let id = self.conn.last_insert_rowid();
        info!("Registered store '{}' ({})", store.name, id);
        Ok(id)
    }

    pub fn update_store(&self, store: &Store) -> Result<()> {
        let id = store.id.context("Cannot update a store without id")?;
        let tags = encode_list(&store.selected_tags)?;
        let files = encode_list(&store.file_names)?;
        let changed = self
            .conn
            .execute(
                "UPDATE stores SET name = ?2, visitation_status = ?3, visit_date = ?4,
                        selected_tag = ?5, memo = ?6, business_hours = ?7,
                        phone_number = ?8, address = ?9, file_name = ?10
                 WHERE id = ?1",
                params![
                    id,
                    store.name,
                    store.visitation_status.raw(),
                    store.visit_date,
                    tags,
                    store.memo,
                    store.business_hours,
                    store.phone_number,
                    store.address,
                    files
                ],
            )
            .with_context(|| format!("Failed to update store {}", id))?;
        if changed == 0 {
            anyhow::bail!("Store {} does not exist", id);
        }
        Ok(())
    }

    /// Removes the row and hands it back so the caller can clean up its photos.
    pub fn delete_store(&self, id: i64) -> Result<Option<Store>> {
        let Some(store) = self.fetch_store(id)? else {
            return Ok(None);
        };
        self.conn
            .execute("DELETE FROM stores WHERE id = ?1", params![id])
            .with_context(|| format!("Failed to delete store {}", id))?;
        info!("Deleted store '{}' ({})", store.name, id);
        Ok(Some(store))
    }

    pub fn fetch_tags(&self) -> Result<Vec<Tag>> {
        let mut stmt = self.conn.prepare("SELECT id, name FROM tags ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok(Tag {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to fetch tags")
    }

    /// Returns false when the tag already existed.
    pub fn add_tag(&self, name: &str) -> Result<bool> {
        let name = name.trim();
        if name.is_empty() {
            anyhow::bail!("Tag name must not be empty");
        }
        validate_item(name)?;
        let inserted = self
            .conn
            .execute("INSERT OR IGNORE INTO tags (name) VALUES (?1)", params![name])
            .context("Failed to insert tag")?;
        Ok(inserted > 0)
    }

    /// Deletes a tag. With `cascade`, the name is also stripped from every
    /// store that carries it; returns the number of stores touched.
    pub fn delete_tag(&mut self, name: &str, cascade: bool) -> Result<usize> {
        let name = name.trim();
        let tx = self.conn.transaction().context("Failed to begin transaction")?;
        let removed = tx.execute("DELETE FROM tags WHERE name = ?1", params![name])?;
        if removed == 0 {
            anyhow::bail!("Tag '{}' does not exist", name);
        }

        let mut touched = 0;
        if cascade {
            let tagged: Vec<(i64, String)> = {
                let mut stmt = tx.prepare("SELECT id, selected_tag FROM stores")?;
                let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            };
            let mut stmt_update = tx.prepare("UPDATE stores SET selected_tag = ?2 WHERE id = ?1")?;
            for (id, raw) in tagged {
                let tags = decode_list(&raw);
                if !tags.iter().any(|t| t == name) {
                    continue;
                }
                let kept: Vec<&String> = tags.iter().filter(|t| *t != name).collect();
                stmt_update.execute(params![id, encode_list(&kept)?])?;
                touched += 1;
            }
        }

        tx.commit().context("Failed to commit transaction")?;
        info!("Deleted tag '{}' ({} stores updated)", name, touched);
        Ok(touched)
    }
}

fn store_from_row(row: &Row<'_>) -> rusqlite::Result<Store> {
    let tags: String = row.get(4)?;
    let files: String = row.get(9)?;
    Ok(Store {
        id: Some(row.get(0)?),
        name: row.get(1)?,
        visitation_status: VisitationStatus::from_raw(row.get(2)?),
        visit_date: row.get(3)?,
        selected_tags: decode_list(&tags),
        memo: row.get(5)?,
        business_hours: row.get(6)?,
        phone_number: row.get(7)?,
        address: row.get(8)?,
        file_names: decode_list(&files),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn store(name: &str, status: VisitationStatus, date: Option<(i32, u32, u32)>) -> Store {
        let mut s = Store::new(name);
        s.visitation_status = status;
        s.visit_date = date.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d));
        s
    }

    #[test]
    fn test_fetch_by_status_sorted_by_visit_date() -> Result<()> {
        let repo = StoreRepository::open_in_memory()?;
        repo.insert_store(&store("Old", VisitationStatus::Visited, Some((2023, 1, 5))))?;
        repo.insert_store(&store("New", VisitationStatus::Visited, Some((2024, 6, 1))))?;
        repo.insert_store(&store("Undated", VisitationStatus::Visited, None))?;
        repo.insert_store(&store("Later", VisitationStatus::Interested, Some((2025, 1, 1))))?;

        let visited: Vec<_> = repo
            .fetch_stores(VisitationStatus::Visited)?
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(visited, vec!["New", "Old", "Undated"]);

        let interested = repo.fetch_stores(VisitationStatus::Interested)?;
        assert_eq!(interested.len(), 1);
        assert_eq!(interested[0].name, "Later");
        Ok(())
    }

    #[test]
    fn test_lists_round_trip_through_columns() -> Result<()> {
        let repo = StoreRepository::open_in_memory()?;
        let mut s = Store::new("Sushi A");
        s.selected_tags = vec!["lunch".into(), "cheap".into()];
        s.file_names = vec!["A.png".into(), "B.png".into()];
        let id = repo.insert_store(&s)?;

        let raw: (String, String) = repo.conn.query_row(
            "SELECT selected_tag, file_name FROM stores WHERE id = ?1",
            params![id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        assert_eq!(raw, ("lunch,cheap".to_string(), "A.png,B.png".to_string()));

        let loaded = repo.fetch_store(id)?.unwrap();
        assert_eq!(loaded.selected_tags, s.selected_tags);
        assert_eq!(loaded.file_names, s.file_names);
        Ok(())
    }

    #[test]
    fn test_empty_list_columns_decode_to_empty() -> Result<()> {
        let repo = StoreRepository::open_in_memory()?;
        let id = repo.insert_store(&Store::new("Plain"))?;
        let loaded = repo.fetch_store(id)?.unwrap();
        assert!(loaded.selected_tags.is_empty());
        assert!(loaded.file_names.is_empty());
        Ok(())
    }

    #[test]
    fn test_upsert_by_name_updates_in_place() -> Result<()> {
        let repo = StoreRepository::open_in_memory()?;
        let first = repo.upsert_by_name(&Store::new("Ramen B"))?;

        let mut again = Store::new("Ramen B");
        again.memo = Some("great broth".into());
        let second = repo.upsert_by_name(&again)?;

        assert_eq!(first, second);
        assert_eq!(repo.fetch_all_stores()?.len(), 1);
        assert_eq!(repo.fetch_store(first)?.unwrap().memo.as_deref(), Some("great broth"));
        Ok(())
    }

    #[test]
    fn test_tag_with_comma_is_rejected() -> Result<()> {
        let repo = StoreRepository::open_in_memory()?;
        assert!(repo.add_tag("cheap,fast").is_err());
        assert!(repo.add_tag("cheap")?);
        assert!(!repo.add_tag("cheap")?);
        assert_eq!(repo.fetch_tags()?.len(), 1);

        let mut s = Store::new("Bad");
        s.selected_tags = vec!["a,b".into()];
        assert!(repo.insert_store(&s).is_err());
        Ok(())
    }

    #[test]
    fn test_delete_tag_cascade() -> Result<()> {
        let mut repo = StoreRepository::open_in_memory()?;
        repo.add_tag("lunch")?;
        repo.add_tag("cheap")?;
        let mut s = Store::new("Sushi A");
        s.selected_tags = vec!["lunch".into(), "cheap".into()];
        let id = repo.insert_store(&s)?;

        assert_eq!(repo.delete_tag("cheap", false)?, 0);
        assert_eq!(repo.fetch_store(id)?.unwrap().selected_tags.len(), 2);

        assert_eq!(repo.delete_tag("lunch", true)?, 1);
        assert_eq!(repo.fetch_store(id)?.unwrap().selected_tags, vec!["cheap".to_string()]);
        assert!(repo.fetch_tags()?.is_empty());
        assert!(repo.delete_tag("lunch", true).is_err());
        Ok(())
    }

    #[test]
    fn test_padded_tag_names_are_trimmed_everywhere() -> Result<()> {
        use crate::filter::StoreFilter;
        use crate::model::StoreDetail;

        let mut repo = StoreRepository::open_in_memory()?;
        repo.add_tag(" lunch")?;
        let mut s = Store::new("Sushi A");
        s.apply_detail(&StoreDetail {
            store_name: "Sushi A".into(),
            selected_tags: vec![" lunch".into(), "lunch ".into()],
            ..Default::default()
        });
        let id = repo.insert_store(&s)?;

        let stored = repo.fetch_all_stores()?;
        assert_eq!(stored[0].selected_tags, vec!["lunch".to_string()]);
        assert_eq!(StoreFilter::new(vec!["lunch".into()], "").apply(&stored).len(), 1);
        assert_eq!(StoreFilter::new(vec![" lunch".into()], "").apply(&stored).len(), 1);

        assert_eq!(repo.delete_tag(" lunch", true)?, 1);
        assert!(repo.fetch_store(id)?.unwrap().selected_tags.is_empty());
        Ok(())
    }

    #[test]
    fn test_delete_store_returns_row() -> Result<()> {
        let repo = StoreRepository::open_in_memory()?;
        let id = repo.insert_store(&Store::new("Gone"))?;
        let removed = repo.delete_store(id)?.unwrap();
        assert_eq!(removed.name, "Gone");
        assert!(repo.fetch_store(id)?.is_none());
        assert!(repo.delete_store(id)?.is_none());
        Ok(())
    }
}
