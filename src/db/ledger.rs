//! Durable running totals of completed exchanges.
//!
//! Three redundant views of the same event stream: the global counter, the
//! per-user `as_exchanger` sums and the per-user `as_customer` sums. A
//! completed exchange lands in all three within one statement.

use tokio_postgres::Error;

use super::{user, Client};

/// One leaderboard row.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Standing {
    pub user: user::Id,
    pub total: f64,
}

/// Which side of an exchange a ranking counts.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Side {
    Exchanger,
    Customer,
}

impl Client {
    /// Creates the ledger tables and seeds the global counter. Idempotent.
    pub async fn init_ledger(&self) -> Result<(), Error> {
        const SQL: &str = "\
            CREATE TABLE IF NOT EXISTS global_total (\
                id SMALLINT PRIMARY KEY CHECK (id = 1), \
                total DOUBLE PRECISION NOT NULL); \
            CREATE TABLE IF NOT EXISTS user_totals (\
                user_id BIGINT PRIMARY KEY, \
                as_exchanger DOUBLE PRECISION NOT NULL DEFAULT 0, \
                as_customer DOUBLE PRECISION NOT NULL DEFAULT 0); \
            INSERT INTO global_total (id, total) \
            VALUES (1, 0) \
            ON CONFLICT (id) DO NOTHING";

        self.0.batch_execute(SQL).await
    }

    /// Tallies one completed exchange into all three views.
    ///
    /// A single data-modifying statement, so the increments commit or fail
    /// together and concurrent completions never lose an update.
    pub async fn record_exchange(
        &self,
        exchanger: user::Id,
        customer: user::Id,
        amount: f64,
    ) -> Result<(), Error> {
        const SQL: &str = "\
            WITH counter AS (\
                UPDATE global_total SET total = total + $3 WHERE id = 1), \
            sent AS (\
                INSERT INTO user_totals (user_id, as_exchanger) \
                VALUES ($1, $3) \
                ON CONFLICT (user_id) DO UPDATE \
                SET as_exchanger = user_totals.as_exchanger + $3) \
            INSERT INTO user_totals (user_id, as_customer) \
            VALUES ($2, $3) \
            ON CONFLICT (user_id) DO UPDATE \
            SET as_customer = user_totals.as_customer + $3";

        // One statement must not upsert the same row twice, so an exchanger
        // completing their own ticket takes a dedicated single-row statement.
        const SELF_SQL: &str = "\
            WITH counter AS (\
                UPDATE global_total SET total = total + $2 WHERE id = 1) \
            INSERT INTO user_totals (user_id, as_exchanger, as_customer) \
            VALUES ($1, $2, $2) \
            ON CONFLICT (user_id) DO UPDATE \
            SET as_exchanger = user_totals.as_exchanger + $2, \
                as_customer = user_totals.as_customer + $2";

        if exchanger == customer {
            self.0
                .execute(SELF_SQL, &[&exchanger, &amount])
                .await
                .map(drop)
        } else {
            self.0
                .execute(SQL, &[&exchanger, &customer, &amount])
                .await
                .map(drop)
        }
    }

    /// Top `limit` members by one side. Ties break toward the smaller user
    /// ID, so consecutive reads of an unchanged ledger order identically.
    pub async fn fetch_top(
        &self,
        side: Side,
        limit: usize,
    ) -> Result<Vec<Standing>, Error> {
        const BY_EXCHANGER: &str = "\
            SELECT user_id, as_exchanger AS total \
            FROM user_totals \
            WHERE as_exchanger > 0 \
            ORDER BY total DESC, user_id ASC \
            LIMIT $1";
        const BY_CUSTOMER: &str = "\
            SELECT user_id, as_customer AS total \
            FROM user_totals \
            WHERE as_customer > 0 \
            ORDER BY total DESC, user_id ASC \
            LIMIT $1";

        let sql = match side {
            Side::Exchanger => BY_EXCHANGER,
            Side::Customer => BY_CUSTOMER,
        };
        let limit = i64::try_from(limit).unwrap();

        Ok(self
            .0
            .query(sql, &[&limit])
            .await?
            .into_iter()
            .map(|row| Standing {
                user: row.get("user_id"),
                total: row.get("total"),
            })
            .collect())
    }

    pub async fn global_total(&self) -> Result<f64, Error> {
        const SQL: &str = "SELECT total FROM global_total WHERE id = 1";
        Ok(self
            .0
            .query_opt(SQL, &[])
            .await?
            .map_or(0.0, |row| row.get("total")))
    }
}
