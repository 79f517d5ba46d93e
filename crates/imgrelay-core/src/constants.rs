//! Fixed values shared across crates.

/// Extension appended to every generated filename.
pub const IMAGE_EXTENSION: &str = "jpg";

/// Content type attached to every uploaded object.
pub const IMAGE_CONTENT_TYPE: &str = "image/jpeg";

/// Region used for request signing when none is configured.
/// MinIO accepts any region, AWS requires the bucket's own.
pub const DEFAULT_S3_REGION: &str = "us-east-1";
