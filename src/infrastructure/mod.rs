pub mod csrf;
pub mod limiter;
pub mod mail;
pub mod storage;
pub mod utils;
