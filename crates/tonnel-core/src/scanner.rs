//! pool history scanner
//!
//! walks a pool contract's transactions newest-first down to the cached
//! cursor and pulls the leaf each successful deposit logged in its
//! external-out message. anything that does not look like a successful
//! deposit is skipped, only transport errors abort the scan.

use crate::address::Address;
use crate::error::Result;
use crate::field::FieldElement;
use crate::ledger::{HistoryRequest, Ledger, Transaction};
use crate::pools::AssetKind;
use crate::{OP_DEPOSIT, OP_STUCK_REMOVE, OP_TRANSFER_NOTIFICATION, PAGE_SIZE};
use tracing::debug;

/// newly scanned leaves and the cursor to persist with them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanResult {
    /// leaves in chain order, oldest first
    pub leaves: Vec<FieldElement>,
    /// logical time of the newest transaction seen, `None` if nothing was new
    pub cursor: Option<u64>,
    /// transactions fetched, matching or not
    pub transactions: usize,
}

pub struct LedgerScanner<'a, L: Ledger> {
    ledger: &'a L,
    page_size: usize,
}

impl<'a, L: Ledger> LedgerScanner<'a, L> {
    pub fn new(ledger: &'a L) -> Self {
        Self {
            ledger,
            page_size: PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// leaves logged after `since` (exclusive)
    pub async fn scan(&self, pool: &Address, kind: AssetKind, since: Option<u64>) -> Result<ScanResult> {
        let transactions = self.fetch_all(pool, since).await?;
        let cursor = transactions.first().map(|tx| tx.lt);
        let leaves = filter_leaves(&transactions, kind);
        debug!(
            "scanned {}: {} transactions, {} leaves",
            pool,
            transactions.len(),
            leaves.len()
        );
        Ok(ScanResult {
            leaves,
            cursor,
            transactions: transactions.len(),
        })
    }

    /// all transactions newer than `since`, newest first
    pub async fn fetch_all(&self, pool: &Address, since: Option<u64>) -> Result<Vec<Transaction>> {
        let mut request = HistoryRequest {
            limit: self.page_size,
            from: None,
            to_lt: since,
        };
        let mut transactions = self.ledger.transactions(pool, &request).await?;
        debug!("fetched page of {} transactions", transactions.len());

        let mut page_len = transactions.len();
        while page_len == self.page_size {
            let oldest = match transactions.last() {
                Some(tx) => tx.cursor(),
                None => break,
            };
            request.from = Some(oldest.clone());
            let page = self.ledger.transactions(pool, &request).await?;
            debug!("fetched page of {} transactions before lt {}", page.len(), oldest.lt);

            page_len = page.len();
            transactions.extend(page);
            // no progress, the ledger handed back the same boundary
            if transactions.last().map(|tx| tx.lt) == Some(oldest.lt) {
                break;
            }
        }
        Ok(transactions)
    }
}

/// operation codes whose successful execution appends a leaf
fn leaf_opcodes(kind: AssetKind) -> [u32; 2] {
    match kind {
        AssetKind::Native => [OP_DEPOSIT, OP_STUCK_REMOVE],
        AssetKind::Token => [OP_TRANSFER_NOTIFICATION, OP_STUCK_REMOVE],
    }
}

/// leaves of newest-first `transactions`, returned oldest first
pub fn filter_leaves(transactions: &[Transaction], kind: AssetKind) -> Vec<FieldElement> {
    let opcodes = leaf_opcodes(kind);
    let mut leaves: Vec<FieldElement> = transactions
        .iter()
        .filter_map(|tx| extract_leaf(tx, &opcodes))
        .collect();
    leaves.reverse();
    leaves
}

fn extract_leaf(tx: &Transaction, opcodes: &[u32]) -> Option<FieldElement> {
    let op = tx.in_msg.as_ref()?.opcode()?;
    if !opcodes.contains(&op) || tx.compute_exit_code != Some(0) {
        return None;
    }
    let value = tx.external_out()?.logged_leaf()?;
    match FieldElement::from_biguint(&value) {
        Ok(leaf) => Some(leaf),
        Err(_) => {
            debug!("skipping out-of-field leaf at lt {}", tx.lt);
            None
        }
    }
}
