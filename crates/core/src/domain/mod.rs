pub mod chat;
pub mod group;
pub mod member;
pub mod poll;
pub mod suggestion;
