//! File name sanitization for names that cross the host/board boundary
//!
//! Names end up inside generated interpreter source (single-quoted string
//! literals), in FTP commands and as archive entry names, so only a
//! conservative character set survives.

/// Longest name accepted after sanitization
pub const MAX_FILENAME_LEN: usize = 255;

/// Sanitizer for client-supplied file names
pub struct FilenameValidator;

impl FilenameValidator {
    /// Reduce a client-supplied name to a flat, safe file name.
    ///
    /// Directory separators become word breaks, whitespace runs become `_`,
    /// anything outside `[A-Za-z0-9._-]` is dropped and leading/trailing
    /// dots and underscores are trimmed. `../../etc/passwd` becomes
    /// `etc_passwd`.
    pub fn sanitize(raw: &str) -> Option<String> {
        let spaced: String = raw
            .chars()
            .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
            .collect();

        let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");

        let filtered: String = joined
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
            .collect();

        let trimmed = filtered.trim_matches(|c| c == '.' || c == '_');

        if trimmed.is_empty() || trimmed.len() > MAX_FILENAME_LEN {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_names_pass_through() {
        assert_eq!(FilenameValidator::sanitize("main.py").as_deref(), Some("main.py"));
        assert_eq!(
            FilenameValidator::sanitize("sensor-log_2.txt").as_deref(),
            Some("sensor-log_2.txt")
        );
    }

    #[test]
    fn test_path_traversal_is_flattened() {
        assert_eq!(
            FilenameValidator::sanitize("../../etc/passwd").as_deref(),
            Some("etc_passwd")
        );
        assert_eq!(
            FilenameValidator::sanitize("..\\boot.py").as_deref(),
            Some("boot.py")
        );
    }

    #[test]
    fn test_quotes_cannot_escape_generated_source() {
        let name = FilenameValidator::sanitize("x'),os.remove('boot.py").unwrap();
        assert!(!name.contains('\''));
        assert!(!name.contains('('));
    }

    #[test]
    fn test_whitespace_becomes_underscore() {
        assert_eq!(
            FilenameValidator::sanitize("my  config file.json").as_deref(),
            Some("my_config_file.json")
        );
    }

    #[test]
    fn test_unusable_names_are_rejected() {
        assert!(FilenameValidator::sanitize("").is_none());
        assert!(FilenameValidator::sanitize("../..").is_none());
        assert!(FilenameValidator::sanitize("ÄÖÜ").is_none());
        assert!(FilenameValidator::sanitize("///").is_none());
        assert!(FilenameValidator::sanitize(&"a".repeat(300)).is_none());
    }
}
