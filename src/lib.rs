//! DialAuth - Security-code authentication with a shared session context
//!
//! Users sign in with a 4-digit security code instead of a password. The
//! `SessionManager` owns the session state; the `api` module serves the
//! login, register and home screens on top of it.

pub mod api;
pub mod backend;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
