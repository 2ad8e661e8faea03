#![doc = "archive-republish-core: core pipeline for archive-republish."]

//! This crate holds the archive extraction and selective republish pipeline.
//! Object store clients, event decoding and CLI glue live in the `archive-republish` crate;
//! the pipeline only depends on the [`contract::ObjectStore`] trait.
//!
//! # Usage
//! Build a [`pipeline::Pipeline`] from an `ObjectStore` and a [`config::PipelineConfig`],
//! then call [`pipeline::Pipeline::run`] once per archive.

pub mod archive;
pub mod cancel;
pub mod config;
pub mod contract;
pub mod error;
pub mod filter;
pub mod key;
pub mod memory;
pub mod pipeline;
pub mod staging;
