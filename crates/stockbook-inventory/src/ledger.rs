//! # Ledger
//!
//! Append-only record of completed sales, held most recent first.
//!
//! There is no edit, void or refund. The only write is [`Ledger::append`]
//! (and the sale coordinator's equivalent, which goes through the backend's
//! atomic sale path instead).

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use crate::error::{InventoryError, InventoryResult};
use stockbook_core::validation::{validate_page, validate_transaction};
use stockbook_core::{Money, TaxRate, Transaction};
use stockbook_db::Backend;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    entries: Vec<Transaction>,
}

/// One page of the reverse-chronological view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerPage {
    pub entries: Vec<Transaction>,
    /// 1-based.
    pub page: usize,
    pub page_size: usize,
    pub total_entries: usize,
    pub total_pages: usize,
}

/// Sales for one UTC calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesSummary {
    pub day: NaiveDate,
    pub transactions: usize,
    pub revenue: Money,
    pub all_time_revenue: Money,
}

impl Ledger {
    /// Builds a ledger from loaded entries, newest first.
    ///
    /// The sort is stable, so entries sharing a timestamp keep their
    /// loaded order.
    pub fn new(mut entries: Vec<Transaction>) -> Self {
        entries.sort_by(|a, b| b.date.cmp(&a.date));
        Ledger { entries }
    }

    /// Persists `entry`, then puts it at the head.
    ///
    /// The entry must have lines and satisfy the totals identities at
    /// `rate`; ids must be new to the ledger.
    pub async fn append(
        &mut self,
        backend: &Backend,
        entry: Transaction,
        rate: TaxRate,
    ) -> InventoryResult<()> {
        validate_transaction(&entry, rate)?;
        if self.get(&entry.id).is_some() {
            return Err(InventoryError::Validation(format!(
                "ledger already holds transaction {}",
                entry.id
            )));
        }

        let after = self.with_head(&entry);
        backend.apply_ledger_append(&entry, &after).await?;
        self.entries = after;

        info!(id = %entry.id, total = %entry.total, "Ledger entry appended");
        Ok(())
    }

    /// The ledger as it would read with `entry` appended.
    pub(crate) fn with_head(&self, entry: &Transaction) -> Vec<Transaction> {
        let mut after = Vec::with_capacity(self.entries.len() + 1);
        after.push(entry.clone());
        after.extend(self.entries.iter().cloned());
        after
    }

    /// Installs entries the backend has already accepted.
    pub(crate) fn install(&mut self, entries: Vec<Transaction>) {
        self.entries = entries;
    }

    pub(crate) fn replace(&mut self, entries: Vec<Transaction>) {
        *self = Ledger::new(entries);
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn entries(&self) -> &[Transaction] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Transaction> {
        self.entries.iter().find(|t| t.id == id)
    }

    /// Page `page` (1-based) of `page_size` entries. Past the end the page
    /// is empty.
    pub fn list(&self, page: usize, page_size: usize) -> InventoryResult<LedgerPage> {
        validate_page(page, page_size)?;

        let total_entries = self.entries.len();
        let entries = self
            .entries
            .iter()
            .skip((page - 1).saturating_mul(page_size))
            .take(page_size)
            .cloned()
            .collect();

        Ok(LedgerPage {
            entries,
            page,
            page_size,
            total_entries,
            total_pages: total_entries.div_ceil(page_size),
        })
    }

    pub fn summary(&self, day: NaiveDate) -> SalesSummary {
        let todays = self
            .entries
            .iter()
            .filter(|t| t.date.date_naive() == day);

        let (transactions, revenue) =
            todays.fold((0, Money::zero()), |(n, sum), t| (n + 1, sum + t.total));

        SalesSummary {
            day,
            transactions,
            revenue,
            all_time_revenue: self.entries.iter().map(|t| t.total).sum(),
        }
    }
}
