pub mod health;
pub mod policies;
