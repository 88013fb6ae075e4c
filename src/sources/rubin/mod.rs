pub mod agenda;
pub mod attachments;
pub mod changes;
pub mod discover;
pub mod meeting;
pub mod table;
