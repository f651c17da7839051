//! Process runtime: component lifecycle and the cooperative worker pool.

pub mod component;
pub mod pool;

pub use {
    component::{Component, LifecycleGate},
    pool::{PoolState, Runnable, WorkerContext, WorkerPool},
};
