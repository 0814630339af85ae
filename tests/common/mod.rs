#![allow(dead_code)]

pub mod builders;
pub mod mock_engine;
pub mod strategies;

pub use builders::*;
pub use mock_engine::*;
