pub mod chrome;
pub mod session;
