pub mod category;
pub mod claims;
pub mod keywords;
pub mod mint;
pub mod payload;
pub mod sign;
pub mod verify;
