//! Durable record-keeping (§4.7): requests, their tag index, and `ScrapeJob` bookkeeping.
//!
//! Grounded in the teacher's `DbContext` — a cheap `Clone`able handle around a `PgPool` that hands
//! out typed `*Ops<'a>` wrappers for each table family, rather than a god-object with every query
//! as a method.

pub mod requests;
pub mod scrape_jobs;

use sqlx::PgPool;

use requests::RequestOps;
use scrape_jobs::ScrapeJobOps;

/// Tombstone-period configuration injected at construction (§4.7).
#[derive(Debug, Clone, Copy)]
pub struct TombstonePeriods {
    pub low_score_days: i64,
    pub tag_days: i64,
    pub manual_days: i64,
}

#[derive(Clone)]
pub struct Store {
    pool: PgPool,
    tombstone_periods: TombstonePeriods,
    tombstone_tags: Vec<String>,
}

impl Store {
    pub fn new(pool: PgPool, tombstone_periods: TombstonePeriods, tombstone_tags: Vec<String>) -> Self {
        Self {
            pool,
            tombstone_periods,
            tombstone_tags,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn tombstone_periods(&self) -> TombstonePeriods {
        self.tombstone_periods
    }

    pub fn requests(&self) -> RequestOps<'_> {
        RequestOps::new(self)
    }

    pub fn scrape_jobs(&self) -> ScrapeJobOps<'_> {
        ScrapeJobOps::new(self)
    }
}
