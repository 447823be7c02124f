//! Data Transfer Objects
//!
//! Request and response bodies that are not full domain records.

pub mod job;
