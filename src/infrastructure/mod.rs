//! Infrastructure layer - Cache backends, record stores and resource services

pub mod cache;
pub mod logging;
pub mod services;
pub mod storage;
