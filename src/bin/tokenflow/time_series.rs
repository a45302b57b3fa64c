// Per-Round JSONL Time Series
// One JSON line per snapshot for independent analysis

use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tokenflow_engine::Snapshot;

#[derive(Debug, Serialize)]
pub struct RoundRecord<'a> {
    pub round: u64,
    pub total: f64,
    pub stingy_count: usize,
    pub edges: usize,
    pub balances: &'a [f64],
    /// Percent change per node since the previous round; empty for round 0.
    pub percent_change: Vec<Option<f64>>,
}

impl<'a> RoundRecord<'a> {
    pub fn new(snapshot: &'a Snapshot, previous: Option<&Snapshot>) -> Self {
        Self {
            round: snapshot.round,
            total: snapshot.total_balance(),
            stingy_count: snapshot.stingy_count,
            edges: snapshot.topology.edges.len(),
            balances: &snapshot.balances,
            percent_change: previous.map(|p| snapshot.percent_changes(p)).unwrap_or_default(),
        }
    }
}

/// Write the whole history as JSONL, creating parent directories.
pub fn write_history(path: &Path, history: &[Snapshot]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);
    for (i, snapshot) in history.iter().enumerate() {
        let previous = i.checked_sub(1).and_then(|p| history.get(p));
        let line = serde_json::to_string(&RoundRecord::new(snapshot, previous))
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        writeln!(file, "{}", line)?;
    }
    file.flush()
}
