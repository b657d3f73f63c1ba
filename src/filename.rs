use crate::io::Reporter;
use crate::schema::Value;

use std::time::Duration;

/// Characters that may not appear in a saved configuration's name.
pub const INVALID_CHARACTERS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Checks that an evaluated filename is a non-empty string free of path
/// separators and other reserved characters, reporting the reason otherwise.
pub fn validate_filename<R: Reporter + ?Sized>(
    filename: &Value,
    reporter: &mut R,
    timeout: Duration,
) -> bool {
    let Some(name) = filename.as_str() else {
        reporter.report("Error", "The filename has to be a string.", Some(timeout));
        return false;
    };
    if name.is_empty() {
        reporter.report("Error", "The filename cannot be empty.", Some(timeout));
        return false;
    }
    if name.contains(INVALID_CHARACTERS) {
        reporter.report(
            "Error",
            "The filename contains an invalid character.",
            Some(timeout),
        );
        return false;
    }
    true
}
