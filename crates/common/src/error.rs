//! Error plumbing shared across the workspace.
//!
//! Every kotori crate defines its own `thiserror` enum; what they share is
//! the ability to wrap a failure in a plain-text context message without
//! dragging in a catch-all error type. [`FromMessage`] is the hook for
//! that, and [`impl_context!`] generates a crate-local extension trait so
//! `Result` and `Option` values can be annotated with `.context("...")`.

/// Error types that can be built from a bare message string.
pub trait FromMessage: Sized {
    fn from_message(message: String) -> Self;
}

/// Generate a `Context` extension trait targeting the given error type.
///
/// Invoke in the module that defines the error, which must implement
/// [`FromMessage`]:
///
/// ```ignore
/// // in crates/foo/src/error.rs
/// kotori_common::impl_context!(Error);
/// ```
#[macro_export]
macro_rules! impl_context {
    ($error:ty) => {
        pub trait Context<T> {
            /// Wrap the failure with a fixed context message.
            fn context(self, context: impl Into<String>) -> std::result::Result<T, $error>;

            /// Wrap the failure with a lazily built context message.
            fn with_context<C, F>(self, f: F) -> std::result::Result<T, $error>
            where
                C: Into<String>,
                F: FnOnce() -> C;
        }

        impl<T, E: std::fmt::Display> Context<T> for std::result::Result<T, E> {
            fn context(self, context: impl Into<String>) -> std::result::Result<T, $error> {
                self.with_context(|| context.into())
            }

            fn with_context<C, F>(self, f: F) -> std::result::Result<T, $error>
            where
                C: Into<String>,
                F: FnOnce() -> C,
            {
                self.map_err(|source| {
                    <$error as $crate::FromMessage>::from_message(format!(
                        "{}: {source}",
                        f().into()
                    ))
                })
            }
        }

        impl<T> Context<T> for Option<T> {
            fn context(self, context: impl Into<String>) -> std::result::Result<T, $error> {
                self.with_context(|| context.into())
            }

            fn with_context<C, F>(self, f: F) -> std::result::Result<T, $error>
            where
                C: Into<String>,
                F: FnOnce() -> C,
            {
                self.ok_or_else(|| <$error as $crate::FromMessage>::from_message(f().into()))
            }
        }
    };
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::FromMessage;

    #[derive(Debug, PartialEq)]
    struct TestError(String);

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(&self.0)
        }
    }

    impl FromMessage for TestError {
        fn from_message(message: String) -> Self {
            Self(message)
        }
    }

    crate::impl_context!(TestError);

    #[test]
    fn option_none_becomes_the_context_message() {
        let missing: Option<u32> = None;
        let err = missing.context("missing thing").unwrap_err();
        assert_eq!(err, TestError("missing thing".into()));
    }

    #[test]
    fn result_err_appends_the_source() {
        let failed: Result<(), &str> = Err("boom");
        let err = failed.context("while exploding").unwrap_err();
        assert_eq!(err, TestError("while exploding: boom".into()));
    }

    #[test]
    fn with_context_is_lazy_on_success() {
        let mut calls = 0;
        let fine: Result<u32, &str> = Ok(7);
        let value = fine
            .with_context(|| {
                calls += 1;
                "unused"
            })
            .unwrap();
        assert_eq!(value, 7);
        assert_eq!(calls, 0);
    }

    #[test]
    fn some_passes_through() {
        let present = Some("x");
        assert_eq!(present.context("unused").unwrap(), "x");
    }
}
