pub mod credentials;
pub mod import;
