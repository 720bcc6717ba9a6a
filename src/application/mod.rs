pub mod bootstrap;

// Stage (b): free text -> structured signal
pub mod extraction;

// Stage (c): pair resolution and market window aggregation
pub mod enrichment;

// Batch orchestrator
pub mod pipeline;
