pub mod credential_offer;
pub mod presentation;
pub mod scanner;
pub mod webauthn;
