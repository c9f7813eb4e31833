pub mod health;
pub mod segments;
