pub mod credentials;
pub mod tenant;
pub mod token;
