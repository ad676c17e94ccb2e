pub mod authenticator;
pub mod context;
pub mod credential_storage;
pub mod key_management;
