//! [`Error`]-related definitions.

use std::{borrow::Cow, fmt, num::TryFromIntError};

use axum_extra::typed_header::TypedHeaderRejection;
use derive_more::Error as StdError;
use juniper::{FieldError, IntoFieldError, Object, Value};
use service::infra::database;
use tracerr::{Trace, Traced};
use tracing as log;

/// Defines an enum of client-facing errors, each variant having its own
/// [`http::StatusCode`], [`Code`] and message.
///
/// # Example
///
/// ```rust
/// # use application::{define_error, Error};
///
/// define_error! {
///     /// Errors of a shelf.
///     enum ShelfError {
///         Empty(CONFLICT, "SHELF_EMPTY") => "Shelf has no books",
///     }
/// }
///
/// let err = Error::from(ShelfError::Empty);
/// assert_eq!(err.code, "SHELF_EMPTY");
/// assert_eq!(err.status, http::StatusCode::CONFLICT);
/// ```
#[expect(clippy::module_name_repetitions, reason = "more readable")]
#[macro_export]
macro_rules! define_error {
    (
        $(#[doc = $doc:literal])*
        enum $name:ident {
            $(
                $variant:ident($status:ident, $code:literal) => $message:literal
            ),* $(,)?
        }
    ) => {
        $(#[doc = $doc])*
        #[derive(Clone, Copy, Debug, Eq, PartialEq)]
        pub enum $name {
            $(
                #[doc = $message]
                $variant,
            )*
        }

        impl $name {
            /// Returns the machine-readable code of this error.
            #[must_use]
            pub const fn code(self) -> $crate::error::Code {
                match self {
                    $(Self::$variant => $code,)*
                }
            }

            /// Returns the [`http::StatusCode`] of this error.
            #[must_use]
            pub const fn status(self) -> ::http::StatusCode {
                match self {
                    $(Self::$variant => ::http::StatusCode::$status,)*
                }
            }

            /// Returns the human-readable message of this error.
            #[must_use]
            pub const fn message(self) -> &'static str {
                match self {
                    $(Self::$variant => $message,)*
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.message())
            }
        }

        impl ::std::error::Error for $name {}

        impl $crate::AsError for $name {
            fn try_as_error(&self) -> Option<$crate::Error> {
                Some((*self).into())
            }
        }

        impl From<$name> for $crate::Error {
            fn from(err: $name) -> Self {
                Self::new(err.status(), err.code(), err.message())
            }
        }
    };
}

/// Error returned to the GraphQL API clients.
#[derive(Clone, Debug, StdError)]
pub struct Error {
    /// [`Code`] of this [`Error`], stable across releases.
    pub code: Code,

    /// [`http::StatusCode`] the response should be sent with.
    pub status: http::StatusCode,

    /// Human-readable message.
    pub message: Cow<'static, str>,

    /// [`Trace`] of the place this [`Error`] originated from, if known.
    pub trace: Option<Trace>,
}

impl Error {
    /// [`Code`] of an [`Error::internal()`].
    pub const INTERNAL: Code = "INTERNAL_SERVER_ERROR";

    /// Creates a new [`Error`] without a [`Trace`].
    #[must_use]
    pub fn new(
        status: http::StatusCode,
        code: Code,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            code,
            status,
            message: message.into(),
            trace: None,
        }
    }

    /// Creates a new [`Error`] for a failure the client cannot do anything
    /// about.
    ///
    /// The provided `cause` is logged, while the client only sees a generic
    /// message.
    #[must_use]
    pub fn internal(cause: &impl fmt::Display) -> Self {
        log::error!("internal error: {cause}");
        Self::new(
            http::StatusCode::INTERNAL_SERVER_ERROR,
            Self::INTERNAL,
            "Internal server error",
        )
    }

    /// Attaches the provided [`Trace`] to this [`Error`].
    #[must_use]
    pub fn with_trace(mut self, trace: Trace) -> Self {
        self.trace = Some(trace);
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]: {}", self.code, self.message)?;
        if let Some(trace) = &self.trace {
            write!(f, "\n{trace}")?;
        }
        Ok(())
    }
}

impl<S> IntoFieldError<S> for Error
where
    S: From<String>,
{
    fn into_field_error(self) -> FieldError<S> {
        let mut extensions = Object::with_capacity(2);
        _ = extensions.add_field("code", Value::scalar(self.code.to_owned()));
        if let Some(trace) = &self.trace {
            let frames = trace
                .iter()
                .map(|frame| Value::scalar(frame.to_string()))
                .collect();
            _ = extensions.add_field("trace", Value::list(frames));
        }
        FieldError::new(self.message, Value::object(extensions))
    }
}

/// Machine-readable code of an [`Error`].
pub type Code = &'static str;

/// Conversion of other errors into client-facing [`Error`]s.
pub trait AsError {
    /// Returns the client-facing [`Error`] this error stands for.
    ///
    /// [`None`] means the client is not supposed to know the details, so an
    /// [`Error::internal()`] is to be reported instead.
    fn try_as_error(&self) -> Option<Error>;

    /// Converts this error into an [`Error`], falling back to an
    /// [`Error::internal()`] one.
    fn as_error(&self) -> Error
    where
        Self: fmt::Display,
    {
        self.try_as_error()
            .unwrap_or_else(|| Error::internal(&self))
    }

    /// Same as [`AsError::as_error()`], but consumes this error.
    fn into_error(self) -> Error
    where
        Self: fmt::Display + Sized,
    {
        self.as_error()
    }
}

impl<E: AsError> AsError for Traced<E> {
    fn try_as_error(&self) -> Option<Error> {
        self.as_ref()
            .try_as_error()
            .map(|e| e.with_trace(self.trace().clone()))
    }
}

impl AsError for TypedHeaderRejection {
    fn try_as_error(&self) -> Option<Error> {
        Some(Error::new(
            http::StatusCode::BAD_REQUEST,
            "BAD_REQUEST",
            self.to_string(),
        ))
    }
}

impl AsError for database::Error {
    fn try_as_error(&self) -> Option<Error> {
        None
    }
}

impl AsError for TryFromIntError {
    fn try_as_error(&self) -> Option<Error> {
        None
    }
}

#[cfg(test)]
mod tests {
    use juniper::{DefaultScalarValue, IntoFieldError};

    use crate::define_error;

    use super::{AsError, Error};

    define_error! {
        /// Errors of a shelf.
        enum ShelfError {
            Empty(CONFLICT, "SHELF_EMPTY") => "Shelf is empty",
            Missing(NOT_FOUND, "SHELF_MISSING") => "Shelf \
                                                    does not exist",
        }
    }

    #[derive(Debug, derive_more::Display)]
    #[display("shelf collapsed")]
    struct Collapsed;

    impl AsError for Collapsed {
        fn try_as_error(&self) -> Option<Error> {
            None
        }
    }

    #[test]
    fn defined_errors_carry_status_and_code() {
        assert_eq!(ShelfError::Missing.to_string(), "Shelf does not exist");

        let err = Error::from(ShelfError::Empty);

        assert_eq!(err.code, "SHELF_EMPTY");
        assert_eq!(err.status, http::StatusCode::CONFLICT);
        assert_eq!(err.to_string(), "[SHELF_EMPTY]: Shelf is empty");

        let field =
            IntoFieldError::<DefaultScalarValue>::into_field_error(err);
        assert_eq!(field.message(), "Shelf is empty");
    }

    #[test]
    fn unknown_errors_are_internal_and_hidden() {
        let err = Collapsed.into_error();

        assert_eq!(err.code, Error::INTERNAL);
        assert_eq!(err.status, http::StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.message.contains("collapsed"));
    }

    #[test]
    fn traced_errors_keep_their_trace() {
        let traced = tracerr::new!(ShelfError::Empty);
        let err = traced.try_as_error().unwrap();

        assert_eq!(err.code, "SHELF_EMPTY");
        assert!(err.trace.is_some());
        assert!(err.to_string().starts_with("[SHELF_EMPTY]: Shelf is empty\n"));
    }
}
