use super::ErrorBag;
use std::error::Error;

/// Error type build over ErrorBag, containing source code location and optional message
/// Note that only creating via macro is possible to catch line and file
#[derive(Debug)]
pub struct RelayError {
    pub inner: ErrorBag,
    pub msg: Option<String>,
    pub file: &'static str,
    pub line: u32,
    pub column: u32,
}

impl RelayError {
    /// Text stored as the order's error message, without source location
    pub fn message(&self) -> String {
        match &self.msg {
            Some(msg) => format!("{}: {}", msg, self.inner),
            None => self.inner.to_string(),
        }
    }
}

impl Error for RelayError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.inner)
    }
}

impl std::fmt::Display for RelayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let file_loc = self.file.replace('\\', "/");
        write!(
            f,
            "{}, {}:{}:{}",
            self.message(),
            file_loc,
            self.line,
            self.column
        )
    }
}
