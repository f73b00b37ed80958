pub mod id;
pub mod store;
pub mod types;

pub use id::generate_session_id;
pub use store::{SessionRetention, SessionStore};
pub use types::{render_transcript, Role, SessionInfo, Turn};
