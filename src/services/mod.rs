pub mod import;
pub mod providers;
pub mod recommendations;
pub mod search;
pub mod signals;

pub use import::{ImportOutcome, ImportService};
pub use recommendations::{RecommendationEngine, DEFAULT_POOL_SIZE};
pub use search::SearchService;
