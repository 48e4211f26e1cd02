use anyhow::Result;

use super::{Holding, HoldingsStore};

/// Non-durable [`HoldingsStore`] kept in a `Vec`, in insertion order.
#[derive(Debug, Default, Clone)]
pub struct MemoryHoldingsStore {
    holdings: Vec<Holding>,
}

impl MemoryHoldingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_holdings(holdings: Vec<Holding>) -> Self {
        Self { holdings }
    }

    pub fn len(&self) -> usize {
        self.holdings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holdings.is_empty()
    }
}

impl HoldingsStore for MemoryHoldingsStore {
    fn upsert(&mut self, holding: &Holding) -> Result<()> {
        match self.holdings.iter_mut().find(|h| h.symbol == holding.symbol) {
            Some(existing) => *existing = holding.clone(),
            None => self.holdings.push(holding.clone()),
        }
        Ok(())
    }

    fn delete(&mut self, symbol: &str) -> Result<bool> {
        let before = self.holdings.len();
        self.holdings.retain(|h| h.symbol != symbol);
        Ok(self.holdings.len() != before)
    }

    fn list_all(&self) -> Result<Vec<Holding>> {
        Ok(self.holdings.clone())
    }
}
