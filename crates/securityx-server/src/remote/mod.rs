//! Adapters for the hosted services.

#[cfg(feature = "postgres")]
pub mod postgres;
pub mod supabase;

#[cfg(feature = "postgres")]
pub use postgres::PostgresRows;
pub use supabase::SupabaseClient;
