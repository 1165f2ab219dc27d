// src/config/mod.rs
pub mod insights;

pub use insights::{
    CacheSection, DataSection, InsightsConfig, ServerSection, DEFAULT_INSIGHTS_CONFIG_PATH,
    ENV_INSIGHTS_CONFIG_PATH,
};
