//! Beacon AWS infrastructure adapters.
//!
//! Implements the resource-facing ports defined in the [`watch`] crate
//! ([`ResourceFetcher`](watch::ResourceFetcher),
//! [`BuildControl`](watch::BuildControl),
//! [`EnvironmentControl`](watch::EnvironmentControl)) using the AWS SDK.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** This crate must not contain domain rules. SDK types,
//! pagination and error metadata stay here; the domain only sees records and
//! typed errors.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`codebuild`] | `CodeBuildAdapter`: build listing, start and delete |
//! | [`beanstalk`] | `BeanstalkAdapter`: environment listing, applications, rebuild |
//! | [`errors`] | SDK error → domain error conversion |

pub mod beanstalk;
pub mod codebuild;
pub mod errors;

pub use beanstalk::{BeanstalkAdapter, SourceBundle, APPLICATION_PLACEHOLDER};
pub use codebuild::{CodeBuildAdapter, DEFAULT_BUILD_WINDOW};

/// Loads shared AWS configuration for `region` from the default provider chain.
pub async fn load_sdk_config(region: &str) -> aws_config::SdkConfig {
    aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(region.to_owned()))
        .load()
        .await
}

/// Converts an SDK timestamp; both SDKs share the smithy `DateTime` type.
pub(crate) fn timestamp(dt: &aws_sdk_codebuild::primitives::DateTime) -> Option<watch::Timestamp> {
    watch::Timestamp::from_unix(dt.secs(), dt.subsec_nanos())
}
