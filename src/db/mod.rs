//! Database module: entity models and SQL repositories.
//!
//! This module is split into two submodules:
//! - `model`: view models returned by repositories (domain entities live in
//!   `crate::model`).
//! - `repo`: SQL-only functions that map rows into entities.
//!
//! External modules should import from `postwheel::db` — we re-export the
//! repository API and the view models for convenience.

pub mod model;
pub mod repo;

pub use model::ReplenishmentPick;
pub use repo::*;
