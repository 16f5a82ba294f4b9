// File: ./src/model/mod.rs
pub mod adapter;
pub mod item;

pub use adapter::events_to_ics;
pub use item::{Event, EventPatch, IdProvider, MAX_TITLE_CHARS, uuid_ids};
