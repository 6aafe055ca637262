//! Railway schedule server.
//!
//! Keeps trains, locations and recurring schedules, checks every schedule
//! write against the schedule rules, answers "does this schedule run on
//! that date?", and streams applied updates to subscribers.

pub mod config;
pub mod domain;
pub mod events;
pub mod store;
pub mod transfer;
pub mod web;
