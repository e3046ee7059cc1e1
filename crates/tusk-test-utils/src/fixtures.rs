// SPDX-FileCopyrightText: 2026 Tusk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Builders for the domain rows tests need.

use chrono::Utc;

use tusk_core::{
    Account, AccountId, Follow, FollowId, Report, ReportId, Status, StatusId, ThreadId, User,
    UserId, Visibility,
};

/// Base URL local fixtures live under.
pub const LOCAL_BASE: &str = "https://local.example";

pub fn local_account(username: &str) -> Account {
    let uri = format!("{LOCAL_BASE}/users/{username}");
    Account {
        id: AccountId::generate(),
        username: username.to_string(),
        domain: None,
        inbox_uri: format!("{uri}/inbox"),
        uri,
        shared_inbox_uri: None,
    }
}

/// A remote account served from `base_url` (e.g. a wiremock server URI).
pub fn remote_account(username: &str, base_url: &str) -> Account {
    let base = base_url.trim_end_matches('/');
    let domain = base.split_once("://").map_or(base, |(_, rest)| rest);
    let uri = format!("{base}/users/{username}");
    Account {
        id: AccountId::generate(),
        username: username.to_string(),
        domain: Some(domain.to_string()),
        inbox_uri: format!("{uri}/inbox"),
        uri,
        shared_inbox_uri: None,
    }
}

/// A confirmed, approved user for `account`.
pub fn user_for(account: &Account, email: &str) -> User {
    User {
        id: UserId::generate(),
        account_id: account.id.clone(),
        email: Some(email.to_string()),
        unconfirmed_email: None,
        confirmation_token: None,
        confirmation_sent_at: None,
        confirmed_at: Some(Utc::now()),
        approved: true,
        disabled: false,
        moderator: false,
        last_emailed_at: None,
    }
}

/// A confirmed moderator for `account`.
pub fn moderator_for(account: &Account, email: &str) -> User {
    User {
        moderator: true,
        ..user_for(account, email)
    }
}

/// A thread-starting status.
pub fn status(author: &Account, visibility: Visibility, mentions: &[&Account]) -> Status {
    let id = StatusId::generate();
    Status {
        uri: format!("{}/statuses/{}", author.uri, id),
        thread_id: ThreadId::generate(),
        in_reply_to_id: None,
        account_id: author.id.clone(),
        visibility,
        mentions: mentions.iter().map(|a| a.id.clone()).collect(),
        created_at: Utc::now(),
        id,
    }
}

/// A reply in `parent`'s thread.
pub fn reply(parent: &Status, author: &Account, mentions: &[&Account]) -> Status {
    let mut status = status(author, parent.visibility, mentions);
    status.thread_id = parent.thread_id.clone();
    status.in_reply_to_id = Some(parent.id.clone());
    status
}

pub fn follow(follower: &Account, target: &Account) -> Follow {
    let id = FollowId::generate();
    Follow {
        uri: format!("{}/follows/{}", follower.uri, id),
        account_id: follower.id.clone(),
        target_account_id: target.id.clone(),
        pending: false,
        id,
    }
}

/// A follow waiting for `target` to approve it.
pub fn follow_request(follower: &Account, target: &Account) -> Follow {
    Follow {
        pending: true,
        ..follow(follower, target)
    }
}

/// A report by `reporter` about `target`.
pub fn report(reporter: &Account, target: &Account, forwarded: bool) -> Report {
    let id = ReportId::generate();
    Report {
        uri: format!("{LOCAL_BASE}/reports/{id}"),
        account_id: reporter.id.clone(),
        target_account_id: target.id.clone(),
        action_taken: None,
        forwarded,
        id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_accounts_take_their_domain_from_the_base_url() {
        let account = remote_account("bob", "http://127.0.0.1:4567/");
        assert_eq!(account.domain.as_deref(), Some("127.0.0.1:4567"));
        assert_eq!(account.inbox_uri, "http://127.0.0.1:4567/users/bob/inbox");
        assert!(!account.is_local());
    }

    #[test]
    fn replies_share_the_thread() {
        let alice = local_account("alice");
        let root = status(&alice, Visibility::Direct, &[]);
        let child = reply(&root, &alice, &[]);
        assert_eq!(root.thread_id, child.thread_id);
        assert!(child.id > root.id);
    }
}
