pub mod catalog;
pub mod chat;
pub mod content;
pub mod events;
pub mod history;
pub mod providers;
