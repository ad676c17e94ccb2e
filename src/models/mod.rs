pub mod credential;
pub mod did;
pub mod presentation;
pub mod webauthn;
