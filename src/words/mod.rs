pub mod bank;
pub mod difficulty;
pub mod source;

// Re-export the main types for convenience
pub use bank::WordBank;
pub use difficulty::Difficulty;
pub use source::{BankSource, FixedWordSource, WordSource};
