pub mod clock;
pub mod key_locks;
pub mod request_identity;
