pub mod jwt;
pub mod telegram;
