//! Analytics over the EduHub course platform: an aggregation-pipeline
//! algebra, the named analytics queries built from it, and the document
//! stores (MongoDB or in-process) that execute them.

pub mod api;
pub mod config;
pub mod database;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod utils;
