// SPDX-FileCopyrightText: 2026 Tusk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Flat (object type, activity type) → handlers table, built once at startup.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;
use tusk_core::{ActivityType, Handler, ObjectType};

#[derive(Default)]
pub struct DispatchTable {
    routes: HashMap<(ObjectType, ActivityType), Vec<Arc<dyn Handler>>>,
}

impl DispatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `handler` for the pair. Registering the same handler name twice for
    /// one pair is ignored.
    pub fn register(
        &mut self,
        object_type: ObjectType,
        activity_type: ActivityType,
        handler: Arc<dyn Handler>,
    ) -> &mut Self {
        let handlers = self.routes.entry((object_type, activity_type)).or_default();
        if handlers.iter().any(|h| h.name() == handler.name()) {
            warn!(
                %object_type,
                %activity_type,
                handler = handler.name(),
                "handler already registered for this pair"
            );
        } else {
            handlers.push(handler);
        }
        self
    }

    /// Register one handler for several pairs.
    pub fn register_all(
        &mut self,
        pairs: &[(ObjectType, ActivityType)],
        handler: Arc<dyn Handler>,
    ) -> &mut Self {
        for &(object_type, activity_type) in pairs {
            self.register(object_type, activity_type, Arc::clone(&handler));
        }
        self
    }

    /// Handlers for the pair. Unknown pairs resolve to an empty slice.
    pub fn resolve(
        &self,
        object_type: ObjectType,
        activity_type: ActivityType,
    ) -> &[Arc<dyn Handler>] {
        self.routes
            .get(&(object_type, activity_type))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every registered pair with its handler names, sorted for display.
    pub fn routes(&self) -> Vec<((ObjectType, ActivityType), Vec<&'static str>)> {
        let mut routes: Vec<_> = self
            .routes
            .iter()
            .map(|(pair, handlers)| (*pair, handlers.iter().map(|h| h.name()).collect()))
            .collect();
        routes.sort_by_key(|(pair, _)| *pair);
        routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
