// Copyright 2026 stowage Project Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::{
    fmt::{Debug, Display},
    sync::Arc,
};

/// ErrorKind is all kinds of Error of stowage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The key is absent in the store tier.
    NotFound,
    /// The transformer failed to decode the stored bytes.
    Decoding,
    /// The transformer failed to encode the object.
    Encoding,
    /// I/O error.
    Io,
    /// The persisted entry attributes are malformed.
    MalformedAttributes,
    /// Config error.
    Config,
}

impl ErrorKind {
    /// Convert self into static str.
    pub fn into_static(self) -> &'static str {
        self.into()
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.into_static())
    }
}

impl From<ErrorKind> for &'static str {
    fn from(v: ErrorKind) -> &'static str {
        match v {
            ErrorKind::NotFound => "Not found",
            ErrorKind::Decoding => "Decoding failed",
            ErrorKind::Encoding => "Encoding failed",
            ErrorKind::Io => "I/O error",
            ErrorKind::MalformedAttributes => "Malformed attributes",
            ErrorKind::Config => "Config error",
        }
    }
}

/// Error is the error struct returned by all stowage functions.
///
/// Via `Display` the error is printed in a single line:
///
/// ```shell
/// Not found, context: { key: https://example.com/a.png } => entry not found
/// ```
///
/// Via `Debug` the context and source are printed on separate lines.
pub struct Error {
    kind: ErrorKind,
    message: String,

    context: Vec<(&'static str, String)>,

    source: Option<Arc<anyhow::Error>>,
}

impl Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)?;
        if !self.message.is_empty() {
            write!(f, " => {}", self.message)?;
        }
        writeln!(f)?;

        if !self.context.is_empty() {
            writeln!(f)?;
            writeln!(f, "Context:")?;
            for (k, v) in self.context.iter() {
                writeln!(f, "  {}: {}", k, v)?;
            }
        }

        if let Some(source) = &self.source {
            writeln!(f)?;
            writeln!(f, "Source:")?;
            writeln!(f, "  {source:#}")?;
        }

        Ok(())
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)?;

        if !self.context.is_empty() {
            write!(f, ", context: {{ ")?;
            let mut iter = self.context.iter().peekable();
            while let Some((k, v)) = iter.next() {
                write!(f, "{}: {}", k, v)?;
                if iter.peek().is_some() {
                    write!(f, ", ")?;
                }
            }
            write!(f, " }}")?;
        }

        if !self.message.is_empty() {
            write!(f, " => {}", self.message)?;
        }

        if let Some(source) = &self.source {
            write!(f, ", source: {source}")?;
        }

        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|v| v.as_ref().as_ref())
    }
}

impl Clone for Error {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            context: self.context.clone(),
            source: self.source.clone(),
        }
    }
}

impl Error {
    /// Create a new error.
    ///
    /// If the error needs to carry a source error, please use `with_source` method.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            context: Vec::new(),
            source: None,
        }
    }

    /// Add more context in error.
    pub fn with_context(mut self, key: &'static str, value: impl ToString) -> Self {
        self.context.push((key, value.to_string()));
        self
    }

    /// Set source for error.
    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        debug_assert!(self.source.is_none(), "the source error has been set");
        self.source = Some(Arc::new(source.into()));
        self
    }

    /// Get the error kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Get the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the error context.
    pub fn context(&self) -> &Vec<(&'static str, String)> {
        &self.context
    }

    /// Get the error source.
    pub fn source(&self) -> Option<&anyhow::Error> {
        self.source.as_deref()
    }

    /// Returns `true` if the error is an [`ErrorKind::NotFound`] error.
    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }
}

/// Result type for stowage.
pub type Result<T> = std::result::Result<T, Error>;

/// Helper methods for Error.
impl Error {
    /// Helper for creating an [`ErrorKind::NotFound`] error for the given key.
    pub fn not_found(key: impl ToString) -> Self {
        Error::new(ErrorKind::NotFound, "entry not found").with_context("key", key)
    }

    /// Helper for creating an [`ErrorKind::Decoding`] error.
    pub fn decoding(source: impl Into<anyhow::Error>) -> Self {
        Error::new(ErrorKind::Decoding, "decode object failed").with_source(source)
    }

    /// Helper for creating an [`ErrorKind::Encoding`] error.
    pub fn encoding(source: impl Into<anyhow::Error>) -> Self {
        Error::new(ErrorKind::Encoding, "encode object failed").with_source(source)
    }

    /// Helper for creating an [`ErrorKind::Config`] error.
    pub fn config(message: impl Into<String>) -> Self {
        Error::new(ErrorKind::Config, message)
    }

    /// Helper for creating an error from [`std::io::Error`].
    ///
    /// [`std::io::ErrorKind::NotFound`] is mapped to [`ErrorKind::NotFound`].
    pub fn io_error(source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::NotFound => Error::new(ErrorKind::NotFound, "file not found").with_source(source),
            _ => Error::new(ErrorKind::Io, "i/o operation failed").with_source(source),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::io_error(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_send_sync_static<T: Send + Sync + 'static>() {}

    #[test]
    fn test_send_sync_static() {
        is_send_sync_static::<Error>();
    }

    #[derive(Debug)]
    struct TestError(String);

    impl Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "TestError: {}", self.0)
        }
    }

    impl std::error::Error for TestError {}

    #[test]
    fn test_error_display() {
        let e = Error::new(ErrorKind::Decoding, "decode object failed")
            .with_context("k1", "v1")
            .with_context("k2", 2)
            .with_source(TestError("bad byte".to_string()));
        assert_eq!(
            e.to_string(),
            "Decoding failed, context: { k1: v1, k2: 2 } => decode object failed, source: TestError: bad byte"
        );
    }

    #[test]
    fn test_error_debug() {
        let e = Error::not_found("k");
        assert_eq!(format!("{e:?}"), "Not found => entry not found\n\nContext:\n  key: k\n");
    }

    #[test]
    fn test_error_source() {
        let e = Error::decoding(TestError("truncated".to_string()));
        assert_eq!(e.kind(), ErrorKind::Decoding);
        assert_eq!(e.source().unwrap().downcast_ref::<TestError>().unwrap().0, "truncated");
    }

    #[test]
    fn test_io_error_mapping() {
        let e: Error = std::io::Error::from(std::io::ErrorKind::NotFound).into();
        assert!(e.is_not_found());

        let e: Error = std::io::Error::from(std::io::ErrorKind::PermissionDenied).into();
        assert_eq!(e.kind(), ErrorKind::Io);
        assert!(e.source().unwrap().downcast_ref::<std::io::Error>().is_some());
    }
}
