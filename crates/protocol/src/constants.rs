/// Processing pipeline requested when a multipart upload is finalized.
pub const DEFAULT_PIPELINE: &str = "dragonfly-img-basic";

/// Default base URL of the media API.
pub const DEFAULT_API_BASE: &str = "http://localhost:8080";

/// Path that hands out a pre-signed upload destination.
pub const STAGING_PATH: &str = "/v1/upload/staging";

/// Path that closes a multipart upload and starts the processing pipeline.
pub const PROCESS_PATH: &str = "/v1/upload/process";

/// Path that reports the processing task status.
pub const STATUS_PATH: &str = "/v1/upload/status";

/// Content type of the finalize and status request bodies.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Builds a full endpoint URL from a base and one of the paths above.
///
/// A trailing `/` on `base` is ignored.
pub fn endpoint(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}
