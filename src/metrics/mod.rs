// Per-worker request metrics

pub mod collector;

pub use collector::{MetricsCollector, MetricsSnapshot, RouteSnapshot};
