pub mod pool;
pub mod store;
