// Library surface for headless/integration tests and reuse.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod classifier;
pub mod config;
pub mod metrics;
pub mod runtime;
pub mod scroller;
pub mod session;
pub mod store;
pub mod words;

pub use session::{Session, SessionConfig, Status, TestBound};
pub use words::Difficulty;
