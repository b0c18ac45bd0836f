use anyhow::Context as _;
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension as _, Row, params};

use super::{CatalogStore, SqliteStore};
use crate::catalog::model::{BookFields, CatalogItem};
use crate::catalog::query::RecommendationFilter;

const ITEM_COLUMNS: &str = "id, title, price, category, availability, created_at";

#[async_trait]
impl CatalogStore for SqliteStore {
    async fn clear(&self) -> anyhow::Result<u64> {
        self.with_conn(|conn| {
            let removed = conn
                .execute("DELETE FROM recommended_books", [])
                .context("delete catalog")?;
            Ok(removed as u64)
        })
        .await
    }

    async fn insert_batch(&self, books: &[BookFields]) -> anyhow::Result<()> {
        let books = books.to_vec();
        self.with_conn(move |conn| {
            let tx = conn.transaction().context("begin insert transaction")?;
            insert_books(&tx, &books)?;
            tx.commit().context("commit catalog insert")?;
            Ok(())
        })
        .await
    }

    async fn replace_all(&self, books: &[BookFields]) -> anyhow::Result<()> {
        let books = books.to_vec();
        self.with_conn(move |conn| {
            let tx = conn.transaction().context("begin replace transaction")?;
            tx.execute("DELETE FROM recommended_books", [])
                .context("delete catalog")?;
            insert_books(&tx, &books)?;
            tx.commit().context("commit catalog replace")?;
            Ok(())
        })
        .await
    }

    async fn recommendations(
        &self,
        filter: &RecommendationFilter,
    ) -> anyhow::Result<Vec<CatalogItem>> {
        let filter = filter.clone();
        self.with_conn(move |conn| {
            let sql = format!(
                "SELECT {ITEM_COLUMNS} FROM recommended_books
                 WHERE (?1 IS NULL OR instr(category_key, ?1) > 0)
                   AND price >= ?2 AND price <= ?3
                 ORDER BY price ASC, id ASC
                 LIMIT ?4"
            );
            let mut stmt = conn.prepare(&sql).context("prepare recommendations")?;
            let rows = stmt
                .query_map(
                    params![
                        filter.category.as_deref().map(str::to_lowercase),
                        filter.price_min,
                        filter.price_max,
                        i64::from(filter.limit)
                    ],
                    item_from_row,
                )
                .context("query recommendations")?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
                .context("read recommendation rows")
        })
        .await
    }

    async fn count(&self) -> anyhow::Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM recommended_books", [], |row| row.get(0))
                .context("count catalog")?;
            Ok(count as u64)
        })
        .await
    }

    async fn latest(&self) -> anyhow::Result<Option<CatalogItem>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {ITEM_COLUMNS} FROM recommended_books ORDER BY id DESC LIMIT 1");
            conn.query_row(&sql, [], item_from_row)
                .optional()
                .context("query latest book")
        })
        .await
    }

    async fn find_by_title(&self, title: &str) -> anyhow::Result<Option<CatalogItem>> {
        let title = title.to_owned();
        self.with_conn(move |conn| {
            let sql = format!(
                "SELECT {ITEM_COLUMNS} FROM recommended_books WHERE title = ?1 ORDER BY id LIMIT 1"
            );
            conn.query_row(&sql, params![title], item_from_row)
                .optional()
                .context("query book by title")
        })
        .await
    }
}

fn insert_books(conn: &Connection, books: &[BookFields]) -> anyhow::Result<()> {
    let mut stmt = conn
        .prepare(
            "INSERT INTO recommended_books
                 (title, price, category, category_key, availability, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .context("prepare book insert")?;
    for book in books {
        stmt.execute(params![
            book.title,
            book.price,
            book.category,
            book.category.to_lowercase(),
            book.availability,
            Utc::now()
        ])
        .with_context(|| format!("insert book: {}", book.title))?;
    }
    Ok(())
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<CatalogItem> {
    Ok(CatalogItem {
        id: row.get(0)?,
        title: row.get(1)?,
        price: row.get(2)?,
        category: row.get(3)?,
        availability: row.get(4)?,
        created_at: row.get(5)?,
    })
}
