pub mod applications;
pub mod jobs;
pub mod profiles;
pub mod resumes;

pub use applications::ApplicationService;
pub use jobs::JobService;
pub use profiles::ProfileService;
pub use resumes::ResumeService;
