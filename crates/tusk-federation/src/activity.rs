// SPDX-FileCopyrightText: 2026 Tusk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Minimal activity documents for outbound delivery.
//!
//! Only the envelope fields receivers need to route an activity are built
//! here; object bodies are referenced by URI.

use serde_json::{Value, json};
use tusk_core::{Account, ActivityType, Message, ObjectType};

pub const ACTIVITYSTREAMS_CONTEXT: &str = "https://www.w3.org/ns/activitystreams";

/// Wire name of the activity for a message, or `None` if it does not federate.
pub fn activity_name(object_type: ObjectType, activity_type: ActivityType) -> Option<&'static str> {
    use ActivityType as A;
    use ObjectType as O;

    let name = match (object_type, activity_type) {
        (O::Note, A::Create) => "Create",
        (O::Note | O::Person, A::Update) => "Update",
        (O::Note | O::Person, A::Delete) => "Delete",
        (O::Follow, A::Create) => "Follow",
        (O::Follow, A::Accept) => "Accept",
        (O::Follow, A::Reject) => "Reject",
        (O::Like, A::Create) => "Like",
        (O::Announce, A::Create) => "Announce",
        (O::Block, A::Create) => "Block",
        (O::Flag, A::Create) => "Flag",
        (O::Follow | O::Like | O::Announce | O::Block, A::Undo) => "Undo",
        _ => return None,
    };
    Some(name)
}

/// The activity being undone by an `Undo` of `object_type`.
fn undone_name(object_type: ObjectType) -> &'static str {
    match object_type {
        ObjectType::Follow => "Follow",
        ObjectType::Like => "Like",
        ObjectType::Announce => "Announce",
        _ => "Block",
    }
}

/// Build the JSON document for `msg`, sent by `actor`, about `object_uri`.
pub fn build_activity(actor: &Account, msg: &Message, object_uri: &str) -> Option<Value> {
    let name = activity_name(msg.object_type(), msg.activity_type())?;
    let id = format!("{}#activities/{}", actor.uri, msg.id());

    let object = if msg.activity_type() == ActivityType::Undo {
        json!({
            "type": undone_name(msg.object_type()),
            "actor": actor.uri,
            "object": object_uri,
        })
    } else if msg.activity_type() == ActivityType::Delete {
        json!({ "type": "Tombstone", "id": object_uri })
    } else {
        Value::String(object_uri.to_string())
    };

    Some(json!({
        "@context": ACTIVITYSTREAMS_CONTEXT,
        "id": id,
        "type": name,
        "actor": actor.uri,
        "object": object,
        "published": msg.enqueued_at().to_rfc3339(),
    }))
}
