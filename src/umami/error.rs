use std::fmt::{Display, Formatter};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UmamiErrorCode {
    OutsideProvider,
    ScriptInjection,
    UnsupportedEnvironment,
}

impl UmamiErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            UmamiErrorCode::OutsideProvider => "umami/outside-provider",
            UmamiErrorCode::ScriptInjection => "umami/script-injection",
            UmamiErrorCode::UnsupportedEnvironment => "umami/unsupported-environment",
        }
    }
}

#[derive(Clone, Debug)]
pub struct UmamiError {
    pub code: UmamiErrorCode,
    message: String,
}

impl UmamiError {
    pub fn new(code: UmamiErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }
}

impl Display for UmamiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code_str())
    }
}

impl std::error::Error for UmamiError {}

pub type UmamiResult<T> = Result<T, UmamiError>;

pub fn outside_provider(accessor: &str) -> UmamiError {
    UmamiError::new(
        UmamiErrorCode::OutsideProvider,
        format!("{accessor} must be used within an UmamiAnalytics provider scope"),
    )
}

pub fn script_injection(message: impl Into<String>) -> UmamiError {
    UmamiError::new(UmamiErrorCode::ScriptInjection, message)
}

pub fn unsupported_environment(message: impl Into<String>) -> UmamiError {
    UmamiError::new(UmamiErrorCode::UnsupportedEnvironment, message)
}

/// Failure detail delivered to the `on_load_error` observer.
///
/// Mirrors what a script element reports: either the raw DOM event that fired on `onerror`, or a
/// plain message when the failure happened before the browser got involved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadError {
    Event { event_type: String },
    Message(String),
}

impl LoadError {
    pub fn message(message: impl Into<String>) -> Self {
        LoadError::Message(message.into())
    }
}

impl Display for LoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::Event { event_type } => {
                write!(f, "tracker script dispatched `{event_type}` event")
            }
            LoadError::Message(message) => f.write_str(message),
        }
    }
}

impl std::error::Error for LoadError {}

impl From<UmamiError> for LoadError {
    fn from(err: UmamiError) -> Self {
        LoadError::Message(err.to_string())
    }
}
