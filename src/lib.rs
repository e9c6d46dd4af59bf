//! Count points of interest inside boundary polygons and build choropleth
//! layers from the counts.
//!
//! The stages run in this order: [`reproject`], [`filter`], [`join`],
//! [`aggregate`], [`choropleth`] and [`partition`]. [`pipeline::Pipeline`]
//! wires them together; [`data`], [`output`] and [`server`] sit around it.

pub mod aggregate;
pub mod choropleth;
pub mod config;
pub mod crs;
pub mod data;
pub mod error;
pub mod filter;
pub mod html;
pub mod join;
pub mod output;
pub mod partition;
pub mod pipeline;
pub mod reproject;
pub mod server;
pub mod types;
