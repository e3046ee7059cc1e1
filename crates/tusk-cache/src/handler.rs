// SPDX-FileCopyrightText: 2026 Tusk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::sync::Arc;

use async_trait::async_trait;

use tusk_core::{
    ActivityType, Handler, HandlerContext, Message, ObjectType, Payload, TuskError,
};

use crate::cache::EntityCache;

/// Evicts cached copies of rows a message says have changed.
pub struct CacheInvalidationHandler {
    cache: Arc<EntityCache>,
}

impl CacheInvalidationHandler {
    pub fn new(cache: Arc<EntityCache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl Handler for CacheInvalidationHandler {
    fn name(&self) -> &'static str {
        "cache"
    }

    async fn handle(&self, _ctx: &HandlerContext, msg: &Message) -> Result<(), TuskError> {
        match (msg.object_type(), msg.activity_type(), msg.payload()) {
            (ObjectType::Note, ActivityType::Update | ActivityType::Delete, Payload::Status(id)) => {
                self.cache.invalidate_status(id);
            }
            (ObjectType::Person, ActivityType::Update | ActivityType::Delete, Payload::Account(id)) => {
                self.cache.invalidate_account(id);
            }
            (ObjectType::Block, _, Payload::Account(target)) => {
                self.cache.invalidate_conversations(msg.origin());
                self.cache.invalidate_conversations(target);
            }
            _ => {}
        }
        Ok(())
    }
}
