pub mod application;
pub mod job;
pub mod profile;
pub mod resume;

pub use application::{Application, ApplicationStatus, ApplicationWithJob, ApplicantRow};
pub use job::{Job, JobSummary, ManagedJob, NewJob};
pub use profile::{Profile, Role};
pub use resume::Resume;
