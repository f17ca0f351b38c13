pub mod login_service;
pub mod mail_service;
pub mod visitor_tracker;

pub use login_service::LoginService;
pub use mail_service::{Mailer, SmtpMailer};
pub use visitor_tracker::{Visit, VisitOutcome, VisitorTracker};
