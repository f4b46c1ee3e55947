//! # Customer Repository
//!
//! The local customer cache used to pre-fill invoices.
//!
//! ## Upsert Match Priority
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  incoming customer                                                      │
//! │       │                                                                 │
//! │       ├── tax_id non-empty and known? ──► update that row              │
//! │       ├── id non-empty and known?     ──► update that row              │
//! │       ├── trimmed name known?         ──► update that row              │
//! │       └── otherwise                   ──► insert at front, new CUST-id │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The tax ID wins because it is the fiscal identity of the buyer.

use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, info};

use crate::error::DbResult;
use crate::repository::UpsertOutcome;
use baht_core::validation::validate_customer_name;
use baht_core::{Customer, DigitString};

#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    id: String,
    name: String,
    address: String,
    tax_id: String,
    phone: String,
    email: String,
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        Customer {
            id: row.id,
            name: row.name,
            address: row.address,
            tax_id: DigitString::new(row.tax_id),
            phone: DigitString::new(row.phone),
            email: row.email,
        }
    }
}

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// All customers, newest first.
    pub async fn list(&self) -> DbResult<Vec<Customer>> {
        let rows: Vec<CustomerRow> = sqlx::query_as(
            "SELECT id, name, address, tax_id, phone, email FROM customers ORDER BY position ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Customer::from).collect())
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Customer>> {
        let row: Option<CustomerRow> = sqlx::query_as(
            "SELECT id, name, address, tax_id, phone, email FROM customers WHERE id = ?1",
        )
        .bind(id.trim())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Customer::from))
    }

    /// Customers matching `query`, in list order, at most `limit`.
    /// See [`Customer::matches_query`] for the matching rules.
    pub async fn search(&self, query: &str, limit: usize) -> DbResult<Vec<Customer>> {
        let found: Vec<Customer> = self
            .list()
            .await?
            .into_iter()
            .filter(|c| c.matches_query(query))
            .take(limit)
            .collect();
        debug!(query, found = found.len(), "Customer search");
        Ok(found)
    }

    /// Exact lookup by customer id, then by tax ID.
    pub async fn find_by_key(&self, key: &str) -> DbResult<Option<Customer>> {
        let key = key.trim();
        if key.is_empty() {
            return Ok(None);
        }
        if let Some(customer) = self.get(key).await? {
            return Ok(Some(customer));
        }
        let row: Option<CustomerRow> = sqlx::query_as(
            "SELECT id, name, address, tax_id, phone, email FROM customers WHERE tax_id = ?1 ORDER BY position ASC LIMIT 1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Customer::from))
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Inserts or updates a customer, returning the stored record.
    ///
    /// ## Errors
    /// `DbError::Validation` when the name is blank; nothing is written.
    pub async fn upsert(&self, customer: &Customer) -> DbResult<(UpsertOutcome, Customer)> {
        let name = validate_customer_name(&customer.name)?;
        let now = Utc::now();

        let mut stored = customer.clone();
        stored.name = name;
        stored.id = stored.id.trim().to_string();

        let mut tx = self.pool.begin().await?;

        let outcome = match find_match(&mut tx, &stored).await? {
            Some(id) => {
                stored.id = id;
                sqlx::query(
                    r#"
                    UPDATE customers SET
                        name = ?2,
                        address = ?3,
                        tax_id = ?4,
                        phone = ?5,
                        email = ?6,
                        updated_at = ?7
                    WHERE id = ?1
                    "#,
                )
                .bind(&stored.id)
                .bind(&stored.name)
                .bind(&stored.address)
                .bind(stored.tax_id.as_str())
                .bind(stored.phone.as_str())
                .bind(stored.email.trim())
                .bind(now)
                .execute(&mut *tx)
                .await?;
                UpsertOutcome::Updated
            }
            None => {
                if stored.id.is_empty() {
                    stored.id = unused_id(&mut tx, &Customer::generate_id(now)).await?;
                }
                let position: i64 =
                    sqlx::query_scalar("SELECT COALESCE(MIN(position), 1) - 1 FROM customers")
                        .fetch_one(&mut *tx)
                        .await?;
                insert_row(&mut tx, &stored, position).await?;
                UpsertOutcome::Inserted
            }
        };

        tx.commit().await?;

        debug!(customer_id = %stored.id, name = %stored.name, ?outcome, "Upserted customer");
        Ok((outcome, stored))
    }

    /// Replaces the whole cache with `customers` in the given order.
    ///
    /// Rows without a name are dropped; a repeated id keeps the last row.
    pub async fn replace_all(&self, customers: &[Customer]) -> DbResult<usize> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM customers").execute(&mut *tx).await?;

        let mut kept = 0;
        for (index, customer) in customers.iter().enumerate() {
            let name = customer.name.trim();
            if name.is_empty() {
                continue;
            }
            let mut row = customer.clone();
            row.name = name.to_string();
            row.id = row.id.trim().to_string();
            if row.id.is_empty() {
                row.id = format!("{}-{}", Customer::generate_id(now), index);
            }
            insert_row(&mut tx, &row, index as i64).await?;
            kept += 1;
        }

        tx.commit().await?;

        info!(customers = kept, "Customer cache replaced");
        Ok(kept)
    }
}

async fn find_match(
    tx: &mut Transaction<'_, Sqlite>,
    customer: &Customer,
) -> DbResult<Option<String>> {
    if !customer.tax_id.is_empty() {
        let id: Option<String> = sqlx::query_scalar(
            "SELECT id FROM customers WHERE tax_id = ?1 ORDER BY position ASC LIMIT 1",
        )
        .bind(customer.tax_id.as_str())
        .fetch_optional(&mut **tx)
        .await?;
        if id.is_some() {
            return Ok(id);
        }
    }

    if !customer.id.is_empty() {
        let id: Option<String> = sqlx::query_scalar("SELECT id FROM customers WHERE id = ?1")
            .bind(&customer.id)
            .fetch_optional(&mut **tx)
            .await?;
        if id.is_some() {
            return Ok(id);
        }
    }

    let id: Option<String> = sqlx::query_scalar(
        "SELECT id FROM customers WHERE TRIM(name) = ?1 ORDER BY position ASC LIMIT 1",
    )
    .bind(customer.name.trim())
    .fetch_optional(&mut **tx)
    .await?;
    Ok(id)
}

/// `base`, or `base-N` when customers saved in the same millisecond
/// already took it.
async fn unused_id(tx: &mut Transaction<'_, Sqlite>, base: &str) -> DbResult<String> {
    let mut candidate = base.to_string();
    let mut suffix = 1;
    loop {
        let taken: Option<i64> = sqlx::query_scalar("SELECT 1 FROM customers WHERE id = ?1")
            .bind(&candidate)
            .fetch_optional(&mut **tx)
            .await?;
        if taken.is_none() {
            return Ok(candidate);
        }
        candidate = format!("{}-{}", base, suffix);
        suffix += 1;
    }
}

async fn insert_row(
    tx: &mut Transaction<'_, Sqlite>,
    customer: &Customer,
    position: i64,
) -> DbResult<()> {
    let now = Utc::now();
    sqlx::query(
        r#"
        INSERT OR REPLACE INTO customers (
            id, position, name, address, tax_id, phone, email, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
        "#,
    )
    .bind(&customer.id)
    .bind(position)
    .bind(&customer.name)
    .bind(&customer.address)
    .bind(customer.tax_id.as_str())
    .bind(customer.phone.as_str())
    .bind(customer.email.trim())
    .bind(now)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig, DbError};

    async fn repo() -> CustomerRepository {
        Database::new(DbConfig::in_memory()).await.unwrap().customers()
    }

    fn customer(name: &str, tax_id: &str) -> Customer {
        Customer {
            name: name.into(),
            tax_id: DigitString::new(tax_id),
            phone: DigitString::new("0812345678"),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_insert_generates_id_and_keeps_zeros() {
        let repo = repo().await;
        let (outcome, stored) = repo.upsert(&customer("ร้าน ก", "0105561234567")).await.unwrap();

        assert_eq!(outcome, UpsertOutcome::Inserted);
        assert!(stored.id.starts_with("CUST-"));

        let loaded = repo.get(&stored.id).await.unwrap().unwrap();
        assert_eq!(loaded.tax_id.as_str(), "0105561234567");
        assert_eq!(loaded.phone.as_str(), "0812345678");
    }

    #[tokio::test]
    async fn test_tax_id_match_wins_over_name() {
        let repo = repo().await;
        let (_, first) = repo.upsert(&customer("ร้าน ก", "0105561234567")).await.unwrap();
        repo.upsert(&customer("ร้าน ข", "")).await.unwrap();

        // same tax id, new name: updates the first row
        let (outcome, stored) = repo
            .upsert(&customer("บริษัท ก จำกัด", "0105561234567"))
            .await
            .unwrap();
        assert_eq!(outcome, UpsertOutcome::Updated);
        assert_eq!(stored.id, first.id);
        assert_eq!(repo.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_name_match_when_no_tax_id() {
        let repo = repo().await;
        repo.upsert(&customer("ร้าน ข", "")).await.unwrap();

        let mut again = customer("  ร้าน ข ", "");
        again.address = "กรุงเทพฯ".into();
        let (outcome, stored) = repo.upsert(&again).await.unwrap();

        assert_eq!(outcome, UpsertOutcome::Updated);
        assert_eq!(stored.name, "ร้าน ข");
        assert_eq!(repo.list().await.unwrap()[0].address, "กรุงเทพฯ");
    }

    #[tokio::test]
    async fn test_blank_name_rejected() {
        let repo = repo().await;
        let err = repo.upsert(&customer("   ", "0105561234567")).await.unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_new_customers_go_first() {
        let repo = repo().await;
        repo.upsert(&customer("ร้าน ก", "")).await.unwrap();
        repo.upsert(&customer("ร้าน ข", "")).await.unwrap();

        let listed = repo.list().await.unwrap();
        assert_ne!(listed[0].id, listed[1].id);
        let names: Vec<String> = listed.into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["ร้าน ข", "ร้าน ก"]);
    }

    #[tokio::test]
    async fn test_search_rules_and_limit() {
        let repo = repo().await;
        repo.upsert(&Customer { id: "SHOP-A".into(), ..customer("Siam Trading", "0105561234567") })
            .await
            .unwrap();
        repo.upsert(&customer("ร้าน ข", "3100100123456")).await.unwrap();

        let names = |found: Vec<Customer>| found.into_iter().map(|c| c.name).collect::<Vec<_>>();
        assert_eq!(names(repo.search("SIAM", 10).await.unwrap()), vec!["Siam Trading"]);
        assert_eq!(names(repo.search("shop-a", 10).await.unwrap()), vec!["Siam Trading"]);
        assert_eq!(names(repo.search("3100100", 10).await.unwrap()), vec!["ร้าน ข"]);
        assert!(repo.search("", 10).await.unwrap().is_empty());

        for i in 0..12 {
            let numbered = Customer {
                id: format!("C{}", i),
                ..customer(&format!("ร้านค้า {}", i), "")
            };
            repo.upsert(&numbered).await.unwrap();
        }
        assert_eq!(repo.search("ร้านค้า", 10).await.unwrap().len(), 10);
    }

    #[tokio::test]
    async fn test_find_by_key() {
        let repo = repo().await;
        let (_, stored) = repo.upsert(&customer("ร้าน ก", "0105561234567")).await.unwrap();

        assert_eq!(repo.find_by_key(&stored.id).await.unwrap().unwrap().name, "ร้าน ก");
        assert_eq!(repo.find_by_key(" 0105561234567 ").await.unwrap().unwrap().id, stored.id);
        assert!(repo.find_by_key("0105561234").await.unwrap().is_none());
        assert!(repo.find_by_key("").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_replace_all_drops_nameless() {
        let repo = repo().await;
        repo.upsert(&customer("เก่า", "")).await.unwrap();

        let remote = vec![
            Customer { id: "C1".into(), ..customer("ร้าน ก", "0105561234567") },
            customer("", "0999999999999"),
            customer("ร้าน ค", ""),
        ];
        assert_eq!(repo.replace_all(&remote).await.unwrap(), 2);

        let all = repo.list().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, "C1");
        assert_eq!(all[1].name, "ร้าน ค");
        assert!(!all[1].id.is_empty());
    }
}
