pub mod config;
pub mod logging;

pub mod engine;
pub mod fetch;
pub mod input;
pub mod naming;
pub mod segmenter;
pub mod storage;
