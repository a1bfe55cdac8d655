mod activity;
mod attachments;
mod launches;
mod locks;
mod logs;
mod projects;
mod users;

pub use activity::ActivityRepo;
pub use attachments::AttachmentRepo;
pub use launches::LaunchRepo;
pub use locks::LockRepo;
pub use logs::LogRepo;
pub use projects::ProjectRepo;
pub use users::UserRepo;

/// A single project-level attribute value, as stored in `project_attribute`.
///
/// Attribute values are free-form text; retention attributes hold a number
/// of seconds. Parsing and validation happen in [`crate::retention`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeValue {
    pub project_id: i64,
    pub value: Option<String>,
}
