//! API Routes
//!
//! Route handlers organized by functionality.

pub mod achievements;
pub mod health;
pub mod login;
pub mod notifications;
pub mod places;
