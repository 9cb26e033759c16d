//! Supabase Backend Access
//!
//! REST access to the hosted Postgres (PostgREST) and auth (GoTrue) APIs.

mod client;

pub use client::{AuthSession, AuthUser, SupabaseClient, SupabaseError};
