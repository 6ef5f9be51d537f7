pub mod user;
pub mod company;
pub mod alert;
pub mod triggered_alert;
pub mod periodic_task;

pub use user::{CurrentUser, User};
pub use company::Company;
pub use alert::{Alert, AlertKind, Comparator};
pub use triggered_alert::TriggeredAlert;
pub use periodic_task::PeriodicTask;
