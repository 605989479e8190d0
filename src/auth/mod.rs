pub mod session;

pub use session::{authorize, mint, AdminSession, SessionError, SessionGrant};
