use lazy_static::lazy_static;
use prometheus::{Counter, Histogram, HistogramOpts, IntGauge, Registry};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // Order mapping metrics
    pub static ref ORDERS_PROCESSED: Counter = Counter::new(
        "recon_orders_processed_total",
        "Order fills applied to a position transition"
    ).unwrap();

    pub static ref ORDERS_SKIPPED_MAPPED: Counter = Counter::new(
        "recon_orders_skipped_mapped_total",
        "Redelivered fills skipped by the idempotency guard"
    ).unwrap();

    pub static ref ORDERS_FAILED: Counter = Counter::new(
        "recon_orders_failed_total",
        "Fills left unmapped after a failed transition"
    ).unwrap();

    // Position metrics
    pub static ref POSITIONS_OPENED: Counter = Counter::new(
        "recon_positions_opened_total",
        "Positions created by the reconstruction engine"
    ).unwrap();

    pub static ref POSITIONS_CLOSED: Counter = Counter::new(
        "recon_positions_closed_total",
        "Positions fully closed and mapped"
    ).unwrap();

    pub static ref POSITION_FLIPS: Counter = Counter::new(
        "recon_position_flips_total",
        "One-way direction flips (fill split into close + open fragments)"
    ).unwrap();

    pub static ref HEDGE_OVERCLOSE_CLAMPS: Counter = Counter::new(
        "recon_hedge_overclose_clamps_total",
        "Hedge exits clamped to the tracked remaining size"
    ).unwrap();

    // Recovery metrics
    pub static ref RECOVERY_SWEEPS: Counter = Counter::new(
        "recon_recovery_sweeps_total",
        "Unmapped-recovery sweeps executed"
    ).unwrap();

    pub static ref UNMAPPED_POSITIONS: IntGauge = IntGauge::new(
        "recon_unmapped_positions",
        "Positions in ClosedUnmapped at the last sweep"
    ).unwrap();

    // Latency metrics
    pub static ref ORDER_PROCESSING_LATENCY: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "recon_order_processing_latency_seconds",
            "End-to-end single fill processing latency"
        ).buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0])
    ).unwrap();
}

pub fn register_metrics() {
    REGISTRY.register(Box::new(ORDERS_PROCESSED.clone())).unwrap();
    REGISTRY.register(Box::new(ORDERS_SKIPPED_MAPPED.clone())).unwrap();
    REGISTRY.register(Box::new(ORDERS_FAILED.clone())).unwrap();
    REGISTRY.register(Box::new(POSITIONS_OPENED.clone())).unwrap();
    REGISTRY.register(Box::new(POSITIONS_CLOSED.clone())).unwrap();
    REGISTRY.register(Box::new(POSITION_FLIPS.clone())).unwrap();
    REGISTRY.register(Box::new(HEDGE_OVERCLOSE_CLAMPS.clone())).unwrap();
    REGISTRY.register(Box::new(RECOVERY_SWEEPS.clone())).unwrap();
    REGISTRY.register(Box::new(UNMAPPED_POSITIONS.clone())).unwrap();
    REGISTRY.register(Box::new(ORDER_PROCESSING_LATENCY.clone())).unwrap();
}
