pub mod email;
pub mod store;
