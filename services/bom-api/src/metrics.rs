use prometheus::{IntCounter, Registry, TextEncoder};

use bomgraph_utils::BomResult;

/// Composition counters exported on `/metrics`.
pub struct ApiMetrics {
    registry: Registry,
    pub components_added: IntCounter,
    pub cycle_rejections: IntCounter,
}

impl ApiMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let components_added = IntCounter::new(
            "bomgraph_components_added_total",
            "BOM items added through guarded inserts",
        )?;
        let cycle_rejections = IntCounter::new(
            "bomgraph_cycle_rejections_total",
            "Component inserts rejected because they would create a cycle",
        )?;

        registry.register(Box::new(components_added.clone()))?;
        registry.register(Box::new(cycle_rejections.clone()))?;

        Ok(Self {
            registry,
            components_added,
            cycle_rejections,
        })
    }

    /// Counts the outcome of a guarded insert.
    pub fn record_insert<T>(&self, result: &BomResult<T>) {
        match result {
            Ok(_) => self.components_added.inc(),
            Err(e) if e.is_cycle_rejection() => self.cycle_rejections.inc(),
            Err(_) => {}
        }
    }

    pub fn render(&self) -> String {
        TextEncoder::new()
            .encode_to_string(&self.registry.gather())
            .unwrap_or_else(|_| "Error encoding metrics".to_string())
    }
}
