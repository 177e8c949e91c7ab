pub mod auth;
pub mod comments;
pub mod profile;
pub mod ratings;
pub mod search;
pub mod threads;
