// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Token Flow Simulation Suite

pub mod adapter;
pub mod config;
pub mod error;
pub mod graph;
pub mod ledger;
pub mod matrix;
pub mod simulation;
pub mod snapshot;
pub mod spectral;
pub mod stingy;
pub mod topology;
pub mod trade;
pub mod types;

pub use config::{AdjacencyRow, BalanceRange, ModelConfig, SimConfig, StingyConfig};
pub use error::{LedgerError, Result, SimError};
pub use graph::{Graph, Topology};
pub use ledger::{Ledger, LedgerEntry, LedgerRow, TransferRecorder};
pub use matrix::TransitionMatrix;
pub use simulation::{run, RunOutput, TokenSimulation};
pub use snapshot::{History, Snapshot};
pub use spectral::ConvergenceReport;
pub use trade::RoundOutcome;
pub use types::*;

use wasm_bindgen::prelude::*;

// ─── WASM Interface ──────────────────────────────────────────────────────────

#[wasm_bindgen]
impl TokenSimulation {
    /// `new TokenSimulation(configJson)`. Rejects invalid configuration with
    /// the error message.
    #[wasm_bindgen(constructor)]
    pub fn from_json(config_json: &str) -> std::result::Result<TokenSimulation, JsValue> {
        #[cfg(target_arch = "wasm32")]
        std::panic::set_hook(Box::new(console_error_panic_hook::hook));

        SimConfig::from_json_str(config_json)
            .and_then(TokenSimulation::new)
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// One round; returns the round outcome.
    pub fn tick(&mut self) -> std::result::Result<JsValue, JsValue> {
        let outcome = self.step().map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(serde_wasm_bindgen::to_value(&outcome).unwrap_or(JsValue::NULL))
    }

    /// Run N rounds without returning results.
    pub fn run_batch(&mut self, rounds: u32) -> std::result::Result<(), JsValue> {
        self.run(rounds as usize)
            .map(|_| ())
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    pub fn get_history(&self) -> JsValue {
        serde_wasm_bindgen::to_value(&self.history).unwrap_or(JsValue::NULL)
    }

    pub fn get_node_ordering(&self) -> JsValue {
        serde_wasm_bindgen::to_value(&self.node_ordering()).unwrap_or(JsValue::NULL)
    }

    /// Current transition matrix as nested row arrays.
    pub fn get_matrix(&self) -> JsValue {
        let rows = self.matrix.to_rows();
        serde_wasm_bindgen::to_value(&rows).unwrap_or(JsValue::NULL)
    }

    pub fn get_convergence(&self) -> JsValue {
        serde_wasm_bindgen::to_value(&self.convergence()).unwrap_or(JsValue::NULL)
    }

    pub fn get_stingy_count(&self) -> u32 {
        self.stingy_count() as u32
    }

    pub fn get_ledger_rows(&self) -> JsValue {
        match &self.ledger {
            Some(ledger) => serde_wasm_bindgen::to_value(&ledger.to_rows()).unwrap_or(JsValue::NULL),
            None => JsValue::NULL,
        }
    }

    /// Start over with the same configuration.
    pub fn reset(&mut self) -> std::result::Result<(), JsValue> {
        *self = TokenSimulation::new(self.config.clone()).map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(())
    }
}
