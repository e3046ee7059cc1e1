// SPDX-FileCopyrightText: 2026 Tusk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Tusk side-effect pipeline.
//!
//! This crate provides the message envelope, the domain rows handlers read,
//! the workspace error type, and the adapter traits (storage, email, signing,
//! handlers) that the other crates implement or consume.

pub mod error;
pub mod model;
pub mod traits;
pub mod types;

pub use error::{ErrorClass, FailureKind, RecipientFailure, TuskError};
pub use model::{
    Account, Conversation, DeadLetter, EmailKind, Follow, Notification, NotificationKind, Report,
    Status, User, Visibility,
};
pub use types::{
    AccountId, ActivityType, AdapterType, ConversationId, FollowId, HandlerContext, HealthStatus,
    Message, MessageId, ObjectType, Payload, ReportId, StatusId, ThreadId, UserId, new_ulid,
};

pub use traits::{EmailContent, EmailSender, Handler, PluginAdapter, Signer, StorageAdapter};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adapter_type_round_trips_through_display() {
        use std::str::FromStr;

        for variant in [
            AdapterType::Storage,
            AdapterType::Email,
            AdapterType::Signer,
            AdapterType::Cache,
            AdapterType::Observability,
        ] {
            let parsed = AdapterType::from_str(&variant.to_string()).expect("should parse back");
            assert_eq!(variant, parsed);
        }
    }

    #[test]
    fn health_status_variants() {
        assert_eq!(HealthStatus::Healthy, HealthStatus::Healthy);
        assert_ne!(HealthStatus::Degraded("slow".into()), HealthStatus::Healthy);
        assert_ne!(HealthStatus::Unhealthy("down".into()), HealthStatus::Healthy);
    }

    #[test]
    fn all_traits_are_exported() {
        fn _assert_plugin_adapter<T: PluginAdapter>() {}
        fn _assert_storage_adapter<T: StorageAdapter>() {}
        fn _assert_email_sender<T: EmailSender>() {}
        fn _assert_signer<T: Signer>() {}
        fn _assert_handler<T: Handler>() {}
    }
}
