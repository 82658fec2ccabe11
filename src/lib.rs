//! Benchmarks for bounding box intersection queries on 3D spatial indices
#![cfg_attr(feature = "strict", deny(warnings), deny(unused_crate_dependencies))]
#![warn(missing_docs)]

// Used by the binary and the demos only.
#[cfg(feature = "strict")]
use anyhow as _;
#[cfg(feature = "strict")]
use clap as _;
#[cfg(feature = "strict")]
use tracing_subscriber as _;

pub mod adapters;
pub mod benchmark;
pub mod collective;
pub mod constants;
pub mod dataset;
pub mod error;
pub mod evaluate;
pub mod geometry;
pub mod index;
pub mod mesh;
pub mod queries;
pub mod report;
pub mod types;
pub mod verify;
