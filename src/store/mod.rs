//! Persistence layer — lead and conversation rows in a hosted table API.

pub mod memory;
pub mod supabase;
pub mod traits;

pub use memory::MemoryStore;
pub use supabase::SupabaseStore;
pub use traits::{LeadStore, Row, SESSION_KEY};
