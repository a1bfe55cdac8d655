mod activity;
mod attachments;
mod launches;
mod locks;
mod logs;
mod projects;
mod users;

pub use activity::PostgresActivityRepo;
pub use attachments::PostgresAttachmentRepo;
pub use launches::PostgresLaunchRepo;
pub use locks::PostgresLockRepo;
pub use logs::PostgresLogRepo;
pub use projects::PostgresProjectRepo;
pub use users::PostgresUserRepo;
