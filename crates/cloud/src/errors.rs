//! Conversion of AWS SDK errors into the domain's error types.

use std::error::Error;
use std::fmt::Debug;

use aws_sdk_codebuild::error::{DisplayErrorContext, SdkError};
use watch::{ControlError, FetchError, ResourceKind};

/// Maps a failed listing call. Service errors are provider rejections;
/// everything else (dispatch, timeout, unreadable response) is transport.
pub fn fetch_error<E, R>(kind: ResourceKind, err: SdkError<E, R>) -> FetchError
where
    E: Error + 'static,
    R: Debug,
{
    let message = DisplayErrorContext(&err).to_string();
    match err {
        SdkError::ServiceError(_) => FetchError::Provider { kind, message },
        _ => FetchError::Transport { kind, message },
    }
}

/// Maps a failed command-surface call.
pub fn control_error<E, R>(operation: &'static str, err: SdkError<E, R>) -> ControlError
where
    E: Error + 'static,
    R: Debug,
{
    ControlError::Provider {
        operation,
        message: DisplayErrorContext(&err).to_string(),
    }
}
