pub mod engine;
pub mod gameplay;
pub mod judgment;
pub mod note;
pub mod scores;
pub mod song;
pub mod timing;
