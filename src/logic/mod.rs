pub mod credentials;
pub mod feedback;
pub mod users;
