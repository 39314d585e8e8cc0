//! HTTP front end for the diabetes prediction service

pub mod api;
pub mod config;
