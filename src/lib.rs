//! Chronicle - a lightweight server-rendered blog system

pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod web;
