pub mod combos;
pub mod config;
pub mod dataset;
pub mod dispatcher;
pub mod feature_extractor;
pub mod gesture_classifier;
pub mod gesture_collector;
pub mod metrics;
pub mod progress;
pub mod simulator;
pub mod training;
pub mod types;
pub mod window_store;
