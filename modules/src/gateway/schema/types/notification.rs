use domain::notification::NotificationEvent;
use juniper::GraphQLObject;

/// Announcement pushed to subscribed clients
#[derive(GraphQLObject)]
pub struct Notification {
    message: String,
}

impl From<NotificationEvent> for Notification {
    fn from(event: NotificationEvent) -> Self {
        Self {
            message: event.message,
        }
    }
}
