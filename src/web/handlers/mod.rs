pub mod health;
pub mod integration;
pub mod moderate;
