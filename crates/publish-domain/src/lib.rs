// publish-domain library entry point
pub mod commit;
pub mod draft;
pub mod error;
pub mod projection;
pub use commit::{CommitResult, VersionToken};
pub use draft::{ContentType, Draft, DraftStatus};
pub use error::DomainError;
pub use projection::{project, slugify, ProjectedDocument};
