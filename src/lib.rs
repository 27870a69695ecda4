//! Fetch-and-normalize client for the MG infrastructure observatory's
//! Waze traffic feeds.
//!
//! The core of the crate is the remote dataset fetcher in [`gis`]:
//! authenticate against the portal's token endpoint, page through a
//! feature-service layer until the first empty page, and return one flat
//! [`dataset::Dataset`] in service order — all pages or none. On top of
//! that, [`dataset`] carries the consumer-side operations the dashboards
//! need: translation of categorical codes to pt-BR labels, length bands,
//! display projections, client-side filters, and value counts.
//!
//! Everything is synchronous and blocking; one fetch is one token plus a
//! strictly sequential run of page requests. The binary in `main.rs` wires
//! these pieces into the `fetch` / `stats` / `health` / `config`
//! subcommands.

pub mod analytics;
pub mod cli;
pub mod config;
pub mod dataset;
pub mod gis;
