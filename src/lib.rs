//! Full-snapshot inventory synchronization into Microsoft Dataverse.

pub mod api;
pub mod config;
pub mod dataverse;
pub mod error;
pub mod inventory;
pub mod model;
pub mod orchestrator;
pub mod upsert;
