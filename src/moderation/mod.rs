// Message moderation: the modifier request contract.
//
// models holds the wire types, settings the typed settings lookup, budget
// the per-request deadline, delivery the optional target_url forwarding,
// and moderator ties them together around a SentimentOracle.

pub mod budget;
pub mod delivery;
pub mod models;
pub mod moderator;
pub mod settings;

pub use moderator::MessageModerator;
