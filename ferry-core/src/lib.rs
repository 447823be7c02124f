//! Ferry Core
//!
//! Core types shared by the Ferry import-job client crates.
//!
//! This crate contains:
//! - Domain types: Import jobs, their lifecycle status and per-source progress
//! - DTOs: Request and response bodies exchanged with the import-job API

pub mod domain;
pub mod dto;
mod timestamp;
