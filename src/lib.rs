// Telex sentiment modifier: flags potentially harmful chat messages.
//
// This is the library root. sentiment wraps the external providers,
// moderation implements the modifier request contract, and web exposes it
// over HTTP.

pub mod config;
pub mod integration;
pub mod moderation;
pub mod sentiment;
pub mod web;
