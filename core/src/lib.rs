pub mod aggregator;
pub mod discovery;
pub mod network;
pub mod reporter;
pub mod scanner;
