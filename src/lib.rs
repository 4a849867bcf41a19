// src/lib.rs

//! Race crawler library
//!
//! Crawls the fixtures, start lists, instruction documents and news of the
//! Swiss orienteering federation into a local item store.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
