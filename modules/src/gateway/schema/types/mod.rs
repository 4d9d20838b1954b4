mod actor;
mod movie;
mod notification;

pub use actor::Actor;
pub use movie::Movie;
pub use notification::Notification;
