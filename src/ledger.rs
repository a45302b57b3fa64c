// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Token Flow Simulation Suite - Transaction Ledger
//
// Append-only, in-memory record of every transfer a trade round implies.
// Single writer; entries are only removed by `clear`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::io::Write;

use crate::adapter::{decimal_sum, from_decimal, to_decimal};
use crate::error::LedgerError;
use crate::types::NodeId;

/// Balance drift tolerated by [`Ledger::validate_conservation`].
const CONSERVATION_TOLERANCE: Decimal = dec!(0.000001);

/// Free-form metadata carried by an entry.
pub type Metadata = Map<String, Value>;

// ---------------------------------------------------------------------------
// Recorder seam
// ---------------------------------------------------------------------------

/// Anything trade propagation can report transfers to.
pub trait TransferRecorder {
    /// Record one transfer and return its transaction id.
    fn record_transfer(
        &mut self,
        iteration: u64,
        from: &NodeId,
        to: &NodeId,
        amount: f64,
        method: &str,
        metadata: Metadata,
    ) -> Result<String, LedgerError>;
}

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LedgerEntry {
    pub tx_id: String,
    pub iteration: u64,
    pub timestamp: DateTime<Utc>,
    pub from: NodeId,
    pub to: NodeId,
    pub amount: f64,
    pub method: String,
    pub metadata: Metadata,
}

/// Flat export row. `metadata` is JSON-encoded, `ts` is seconds since epoch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LedgerRow {
    pub tx_id: String,
    pub iteration: u64,
    pub ts: f64,
    pub from_node: String,
    pub to_node: String,
    pub amount: f64,
    pub method: String,
    pub metadata: String,
}

impl From<&LedgerEntry> for LedgerRow {
    fn from(e: &LedgerEntry) -> Self {
        Self {
            tx_id: e.tx_id.clone(),
            iteration: e.iteration,
            ts: e.timestamp.timestamp_micros() as f64 / 1_000_000.0,
            from_node: e.from.0.clone(),
            to_node: e.to.0.clone(),
            amount: e.amount,
            method: e.method.clone(),
            metadata: Value::Object(e.metadata.clone()).to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ledger {
    entries: Vec<LedgerEntry>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a transfer with a fresh UUID and the current time.
    pub fn record(
        &mut self,
        iteration: u64,
        from: &NodeId,
        to: &NodeId,
        amount: f64,
        method: &str,
        metadata: Metadata,
    ) -> Result<String, LedgerError> {
        self.record_with(None, None, iteration, from, to, amount, method, metadata)
    }

    /// Append a transfer, optionally with a caller-chosen id and timestamp.
    #[allow(clippy::too_many_arguments)]
    pub fn record_with(
        &mut self,
        tx_id: Option<String>,
        timestamp: Option<DateTime<Utc>>,
        iteration: u64,
        from: &NodeId,
        to: &NodeId,
        amount: f64,
        method: &str,
        metadata: Metadata,
    ) -> Result<String, LedgerError> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(LedgerError::InvalidAmount(amount));
        }
        let tx_id = tx_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        self.entries.push(LedgerEntry {
            tx_id: tx_id.clone(),
            iteration,
            timestamp: timestamp.unwrap_or_else(Utc::now),
            from: from.clone(),
            to: to.clone(),
            amount,
            method: method.to_string(),
            metadata,
        });
        Ok(tx_id)
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries recorded for one round.
    pub fn get_iteration(&self, iteration: u64) -> Vec<&LedgerEntry> {
        self.query(|e| e.iteration == iteration)
    }

    pub fn query<F>(&self, predicate: F) -> Vec<&LedgerEntry>
    where
        F: Fn(&LedgerEntry) -> bool,
    {
        self.entries.iter().filter(|e| predicate(e)).collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Total amount moved per round.
    pub fn summary_by_iteration(&self) -> BTreeMap<u64, f64> {
        let mut totals: BTreeMap<u64, Decimal> = BTreeMap::new();
        for e in &self.entries {
            *totals.entry(e.iteration).or_insert(Decimal::ZERO) += to_decimal(e.amount);
        }
        totals.into_iter().map(|(k, v)| (k, from_decimal(v))).collect()
    }

    /// Whether two balance maps hold the same total.
    pub fn validate_conservation(
        &self,
        before: &BTreeMap<NodeId, f64>,
        after: &BTreeMap<NodeId, f64>,
    ) -> bool {
        let s1 = decimal_sum(before.values().copied());
        let s2 = decimal_sum(after.values().copied());
        (s1 - s2).abs() < CONSERVATION_TOLERANCE
    }

    pub fn to_rows(&self) -> Vec<LedgerRow> {
        self.entries.iter().map(LedgerRow::from).collect()
    }

    /// One JSON row per line. Flushes before returning so buffered
    /// writers surface their final write error.
    pub fn write_jsonl<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
        for row in self.to_rows() {
            let line = serde_json::to_string(&row)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
            writeln!(writer, "{}", line)?;
        }
        writer.flush()
    }
}

impl TransferRecorder for Ledger {
    fn record_transfer(
        &mut self,
        iteration: u64,
        from: &NodeId,
        to: &NodeId,
        amount: f64,
        method: &str,
        metadata: Metadata,
    ) -> Result<String, LedgerError> {
        self.record(iteration, from, to, amount, method, metadata)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
