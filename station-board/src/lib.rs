//! Station board server.
//!
//! Live arrivals and departures for UK stations from the National Rail
//! Darwin feed, with delay checks and email/SMS/push alerts.

pub mod board;
pub mod config;
pub mod darwin;
pub mod domain;
pub mod logging;
pub mod notify;
pub mod stations;
pub mod web;
