pub mod chat;
pub mod health;
pub mod probe;
pub mod ui;
