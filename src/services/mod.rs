mod analytics;
mod openrouter;
mod strategy;
mod summary;

pub use analytics::{AnalyticsResponse, AnalyticsService};
pub use openrouter::OpenRouterClient;
pub use strategy::{StrategyResponse, StrategyService};
pub use summary::{SummaryResponse, SummaryService};
