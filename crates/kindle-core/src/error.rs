use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Scan failed: {0}")]
    Scan(#[from] ScanError),

    #[error("Icon error: {0}")]
    Icon(String),
}

/// Failures reported by a scanner during a cache rebuild.
///
/// A rebuild that hits one of these keeps the previous snapshot.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("cannot read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("walk error under {root}: {message}")]
    Walk { root: PathBuf, message: String },

    #[error("scanner failed: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err = Error::Io(io_err);
        assert!(err.to_string().contains("IO error"));
        assert!(err.to_string().contains("file missing"));
    }

    #[test]
    fn test_error_display_json() {
        let json_err = serde_json::from_str::<String>("not valid json").unwrap_err();
        let err = Error::Json(json_err);
        assert!(err.to_string().contains("JSON error"));
    }

    #[test]
    fn test_error_display_config() {
        let err = Error::Config("missing field".to_string());
        assert_eq!(err.to_string(), "Config error: missing field");
    }

    #[test]
    fn test_scan_error_wraps_into_error() {
        let scan = ScanError::Unreadable {
            path: PathBuf::from("/Applications"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let err: Error = scan.into();
        assert!(matches!(err, Error::Scan(_)));
        assert_eq!(
            err.to_string(),
            "Scan failed: cannot read /Applications: denied"
        );
    }

    #[test]
    fn test_scan_error_walk_display() {
        let err = ScanError::Walk {
            root: PathBuf::from("/opt/apps"),
            message: "loop detected".to_string(),
        };
        assert_eq!(err.to_string(), "walk error under /opt/apps: loop detected");
    }

    #[test]
    fn test_error_display_icon() {
        let err = Error::Icon("renderer exited".to_string());
        assert_eq!(err.to_string(), "Icon error: renderer exited");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("access denied"));
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_error() -> Result<()> {
            Err(Error::Config("bad".into()))
        }
        assert!(returns_error().is_err());
    }
}
