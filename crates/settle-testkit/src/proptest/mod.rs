//! Proptest strategies for settle property-based testing

pub mod strategies;

pub use strategies::{
    strategy_interval_ms, strategy_retry_script, strategy_script, strategy_wait_millis,
};
