use std::fmt;

#[derive(Debug)]
pub enum TodoError {
    Api { status: u16, message: String },
    Http(reqwest::Error),
    Config(String),
    Io(std::io::Error),
    Json(serde_json::Error),
    TomlDe(toml::de::Error),
    PageConflict(String),
    TaskNotFound(String),
}

impl fmt::Display for TodoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Api { status, message } => write!(f, "API error ({}): {}", status, message),
            Self::Http(e) => write!(f, "HTTP error: {}", e),
            Self::Config(msg) => write!(f, "Config error: {}", msg),
            Self::Io(e) => write!(f, "IO error: {}", e),
            Self::Json(e) => write!(f, "JSON error: {}", e),
            Self::TomlDe(e) => write!(f, "TOML parse error: {}", e),
            Self::PageConflict(name) => write!(f, "Page resolution conflict: {}", name),
            Self::TaskNotFound(id) => write!(f, "No cached task with id: {}", id),
        }
    }
}

impl std::error::Error for TodoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Http(e) => Some(e),
            Self::Io(e) => Some(e),
            Self::Json(e) => Some(e),
            Self::TomlDe(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for TodoError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e)
    }
}

impl From<std::io::Error> for TodoError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for TodoError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

impl From<toml::de::Error> for TodoError {
    fn from(e: toml::de::Error) -> Self {
        Self::TomlDe(e)
    }
}

pub type Result<T> = std::result::Result<T, TodoError>;

/// Structured error data for the engine message channel
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorInfo {
    Api { status: u16, body: String },
    Network(String),
    Write(String),
    PageConflict(String),
}

impl ErrorInfo {
    pub fn from_todo_error(e: &TodoError) -> Self {
        match e {
            TodoError::Api { status, message } => ErrorInfo::Api {
                status: *status,
                body: message.clone(),
            },
            TodoError::PageConflict(name) => ErrorInfo::PageConflict(name.clone()),
            _ => ErrorInfo::Network(e.to_string()),
        }
    }

    /// Classify a failed mutation. API responses keep their status so the
    /// 429/401 notices stay reachable; everything else is a generic write
    /// failure.
    pub fn from_write_failure(e: &TodoError) -> Self {
        match e {
            TodoError::Api { status, message } => ErrorInfo::Api {
                status: *status,
                body: message.clone(),
            },
            _ => ErrorInfo::Write(e.to_string()),
        }
    }
}

/// Ready-to-surface notice content for the host's toast channel
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub title: String,
    pub message: String,
    pub hint: String,
}

impl Notice {
    pub fn from_error_info(info: &ErrorInfo) -> Self {
        match info {
            ErrorInfo::Api { status, body } => Self::from_api(*status, body),
            ErrorInfo::Network(msg) => Self {
                title: "Store Unavailable".into(),
                message: truncate(msg, 80),
                hint: "Showing last known tasks".into(),
            },
            ErrorInfo::Write(msg) => Self {
                title: "Write Failed".into(),
                message: truncate(msg, 80),
                hint: "Your change was not saved".into(),
            },
            ErrorInfo::PageConflict(name) => Self {
                title: "Page Conflict".into(),
                message: format!("Could not resolve journal page {}", name),
                hint: "Try creating the task again".into(),
            },
        }
    }

    fn from_api(status: u16, body: &str) -> Self {
        let extracted_message = extract_json_message(body);

        match status {
            429 => Self {
                title: "Rate Limited".into(),
                message: extracted_message.unwrap_or_else(|| "Too many requests".into()),
                hint: "Wait a moment and try again".into(),
            },
            401 => Self {
                title: "Unauthorized".into(),
                message: "Invalid API token".into(),
                hint: "Check your config.toml".into(),
            },
            _ => Self {
                title: format!("API Error ({})", status),
                message: extracted_message.unwrap_or_else(|| truncate(body, 200)),
                hint: "Try again later".into(),
            },
        }
    }

    pub fn as_toast(&self) -> String {
        format!("{}: {} ({})", self.title, self.message, self.hint)
    }
}

fn extract_json_message(body: &str) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message")?.as_str().map(String::from))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_displays_status_and_message() {
        let err = TodoError::Api {
            status: 401,
            message: "Unauthorized".into(),
        };
        assert_eq!(err.to_string(), "API error (401): Unauthorized");
    }

    #[test]
    fn config_error_displays_message() {
        let err = TodoError::Config("missing host.token".into());
        assert_eq!(err.to_string(), "Config error: missing host.token");
    }

    #[test]
    fn io_error_converts_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: TodoError = io_err.into();
        assert!(matches!(err, TodoError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn json_error_converts_from_serde() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();
        let err: TodoError = json_err.into();
        assert!(matches!(err, TodoError::Json(_)));
    }

    #[test]
    fn toml_error_converts_from_toml_de() {
        let toml_err = toml::from_str::<toml::Value>("= invalid").unwrap_err();
        let err: TodoError = toml_err.into();
        assert!(matches!(err, TodoError::TomlDe(_)));
    }

    #[test]
    fn page_conflict_displays_page_name() {
        let err = TodoError::PageConflict("Mar 5th, 2024".into());
        assert!(err.to_string().contains("Mar 5th, 2024"));
    }

    #[test]
    fn notice_from_429_extracts_message() {
        let info = ErrorInfo::Api {
            status: 429,
            body: r#"{"message":"You've crossed your quota, please try again later."}"#.into(),
        };
        let notice = Notice::from_error_info(&info);
        assert_eq!(notice.title, "Rate Limited");
        assert!(notice.message.contains("crossed your quota"));
    }

    #[test]
    fn notice_from_429_fallback() {
        let info = ErrorInfo::Api {
            status: 429,
            body: "rate limited plain text".into(),
        };
        let notice = Notice::from_error_info(&info);
        assert_eq!(notice.message, "Too many requests");
    }

    #[test]
    fn notice_from_401() {
        let info = ErrorInfo::Api {
            status: 401,
            body: "".into(),
        };
        let notice = Notice::from_error_info(&info);
        assert_eq!(notice.title, "Unauthorized");
        assert_eq!(notice.hint, "Check your config.toml");
    }

    #[test]
    fn notice_from_unknown_status_with_json() {
        let info = ErrorInfo::Api {
            status: 502,
            body: r#"{"message":"bad gateway"}"#.into(),
        };
        let notice = Notice::from_error_info(&info);
        assert_eq!(notice.title, "API Error (502)");
        assert_eq!(notice.message, "bad gateway");
    }

    #[test]
    fn notice_from_network_keeps_stale_data_hint() {
        let info = ErrorInfo::Network("connection refused".into());
        let notice = Notice::from_error_info(&info);
        assert_eq!(notice.title, "Store Unavailable");
        assert_eq!(notice.hint, "Showing last known tasks");
    }

    #[test]
    fn notice_from_write() {
        let info = ErrorInfo::Write("timeout writing block".into());
        let notice = Notice::from_error_info(&info);
        assert_eq!(notice.title, "Write Failed");
        assert_eq!(notice.message, "timeout writing block");
    }

    #[test]
    fn notice_truncates_long_message() {
        let long_msg = "a".repeat(100);
        let info = ErrorInfo::Network(long_msg);
        let notice = Notice::from_error_info(&info);
        assert!(notice.message.len() <= 83); // 80 + "..."
        assert!(notice.message.ends_with("..."));
    }

    #[test]
    fn error_info_from_api_error() {
        let err = TodoError::Api {
            status: 429,
            message: "rate limited".into(),
        };
        let info = ErrorInfo::from_todo_error(&err);
        match info {
            ErrorInfo::Api { status, body } => {
                assert_eq!(status, 429);
                assert_eq!(body, "rate limited");
            }
            _ => panic!("Expected ErrorInfo::Api"),
        }
    }

    #[test]
    fn error_info_from_config_error_becomes_network() {
        let err = TodoError::Config("bad config".into());
        let info = ErrorInfo::from_todo_error(&err);
        assert!(matches!(info, ErrorInfo::Network(_)));
    }

    #[test]
    fn write_failure_keeps_api_status() {
        let err = TodoError::Api {
            status: 429,
            message: "rate limited".into(),
        };
        let info = ErrorInfo::from_write_failure(&err);
        assert!(matches!(info, ErrorInfo::Api { status: 429, .. }));
        let notice = Notice::from_error_info(&info);
        assert_eq!(notice.title, "Rate Limited");
    }

    #[test]
    fn write_failure_falls_back_to_generic_write() {
        let err = TodoError::TaskNotFound("b-1".into());
        let info = ErrorInfo::from_write_failure(&err);
        assert!(matches!(info, ErrorInfo::Write(_)));
    }

    #[test]
    fn error_info_from_page_conflict() {
        let err = TodoError::PageConflict("2024-03-05".into());
        let info = ErrorInfo::from_todo_error(&err);
        assert_eq!(info, ErrorInfo::PageConflict("2024-03-05".into()));
    }
}
