//! Data models for the book rental server

pub mod auth;
pub mod book;
pub mod enums;
pub mod loan;
pub mod member;
pub mod pagination;
pub mod reservation;
pub mod search_history;

pub use enums::*;
