pub mod models;
pub mod error;
pub mod config;
pub mod dictionary;
pub mod mutator;
pub mod engine;
pub mod priming;
pub mod events;
pub mod audit;
pub mod verdict;
pub mod scan;
pub mod session;
pub mod reporting;
pub mod params;
pub mod logging;

// Re-export commonly used items
pub use models::*;
pub use error::*;
pub use config::*;
pub use dictionary::*;
pub use mutator::*;
pub use engine::*;
pub use priming::*;
pub use events::*;
pub use audit::*;
pub use verdict::*;
pub use scan::*;
pub use session::*;
pub use reporting::*;
pub use params::*;
