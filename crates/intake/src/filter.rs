use crate::IntakeError;

/// MIME types the picker accepts.
pub const ACCEPTED_TYPES: [&str; 4] = ["image/jpeg", "image/jpg", "image/png", "image/gif"];

/// Extensions matching [`ACCEPTED_TYPES`], lowercase.
const ACCEPTED_EXTENSIONS: [&str; 4] = ["jpeg", "jpg", "png", "gif"];

/// Checks that a picked file is one of the accepted image types.
///
/// The decision is made on the file extension, case-insensitively.
pub fn check_accepted(name: &str) -> Result<(), IntakeError> {
    let accepted = name
        .rsplit_once('.')
        .map(|(stem, ext)| {
            !stem.is_empty() && ACCEPTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
        })
        .unwrap_or(false);

    if accepted {
        Ok(())
    } else {
        Err(IntakeError::UnsupportedType {
            name: name.to_string(),
        })
    }
}
