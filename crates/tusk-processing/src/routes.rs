// SPDX-FileCopyrightText: 2026 Tusk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The message catalogue: which handlers run for which event.

use std::sync::Arc;

use tusk_core::{ActivityType as A, Handler, ObjectType as O};
use tusk_workers::DispatchTable;

/// One instance of every pipeline handler.
pub struct Handlers {
    pub federation: Arc<dyn Handler>,
    pub email: Arc<dyn Handler>,
    pub timeline: Arc<dyn Handler>,
    pub cache: Arc<dyn Handler>,
    pub account_cascade: Arc<dyn Handler>,
    pub notify: Arc<dyn Handler>,
}

pub fn build_dispatch_table(handlers: &Handlers) -> DispatchTable {
    let mut table = DispatchTable::new();

    table
        .register_all(
            &[
                (O::Note, A::Create),
                (O::Note, A::Update),
                (O::Note, A::Delete),
                (O::Person, A::Update),
                (O::Person, A::Delete),
                (O::Follow, A::Create),
                (O::Follow, A::Accept),
                (O::Follow, A::Reject),
                (O::Follow, A::Undo),
                (O::Like, A::Create),
                (O::Like, A::Undo),
                (O::Announce, A::Create),
                (O::Announce, A::Undo),
                (O::Block, A::Create),
                (O::Block, A::Undo),
                (O::Flag, A::Create),
            ],
            Arc::clone(&handlers.federation),
        )
        .register_all(
            &[(O::Note, A::Create), (O::Note, A::Update), (O::Note, A::Delete)],
            Arc::clone(&handlers.timeline),
        )
        .register_all(
            &[
                (O::Note, A::Update),
                (O::Note, A::Delete),
                (O::Person, A::Update),
                (O::Person, A::Delete),
                (O::Block, A::Create),
                (O::Block, A::Undo),
            ],
            Arc::clone(&handlers.cache),
        )
        .register(O::Person, A::Delete, Arc::clone(&handlers.account_cascade))
        .register_all(
            &[
                (O::Profile, A::Create),
                (O::Profile, A::Update),
                (O::Profile, A::Accept),
                (O::Profile, A::Reject),
                (O::Flag, A::Create),
                (O::Flag, A::Update),
            ],
            Arc::clone(&handlers.email),
        )
        .register_all(
            &[
                (O::Note, A::Create),
                (O::Follow, A::Create),
                (O::Follow, A::Accept),
                (O::Like, A::Create),
                (O::Announce, A::Create),
                (O::Profile, A::Create),
            ],
            Arc::clone(&handlers.notify),
        );

    table
}
