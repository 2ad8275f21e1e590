pub mod auth;
pub mod cart;
pub mod catalog;
pub mod chat;
pub mod notifications;
pub mod orders;
pub mod profile;
pub mod rewards;
pub mod subscriptions;
