mod dispatcher;
mod mailer;

pub use dispatcher::NotificationDispatcher;
pub use mailer::{DealMailer, MailerError, MockMailer, ResendMailer};
