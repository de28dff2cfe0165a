// Pairing platform API
//
// `client` holds transport mechanics and envelope handling; `pairing`
// implements the endpoints as inherent methods; `models` carries the
// wire shapes exactly as the platform sends them.

pub mod client;
pub mod models;
mod pairing;

pub use client::PlatformClient;
