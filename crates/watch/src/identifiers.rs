//! Newtype domain identifiers.
//!
//! Every resource and chat concept that has an identity is represented as a
//! distinct newtype wrapping a string. This prevents accidentally interchanging,
//! for example, a [`BuildId`] with a [`ProjectName`] even though both are plain
//! strings on the wire.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Build identifiers
// ---------------------------------------------------------------------------

string_id! {
    /// Identifies one build invocation (e.g. `"my-project:0b6c…"`).
    ///
    /// Opaque to Beacon; unique per invocation.
    BuildId
}

string_id! {
    /// Name of a build project.
    ProjectName
}

// ---------------------------------------------------------------------------
// Environment identifiers
// ---------------------------------------------------------------------------

string_id! {
    /// Name of a deployment environment. Unique across the account region.
    EnvironmentName
}

string_id! {
    /// Name of the application an environment belongs to.
    ApplicationName
}

string_id! {
    /// Label of a deployed application version.
    VersionLabel
}

// ---------------------------------------------------------------------------
// Chat identifiers
// ---------------------------------------------------------------------------

string_id! {
    /// A chat channel or direct-message conversation (e.g. `"C0123ABCD"`).
    ChannelId
}

string_id! {
    /// A chat user as known to the chat provider (e.g. `"U0456EFGH"`).
    ChatUserId
}

string_id! {
    /// Email address used to key the permission table.
    UserEmail
}
