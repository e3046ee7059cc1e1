// SPDX-FileCopyrightText: 2026 Tusk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plain-text email templates.

use tusk_config::model::ServerConfig;
use tusk_core::{EmailContent, EmailKind};

#[derive(Debug, Clone)]
pub struct Templates {
    instance_name: String,
    base_url: String,
}

impl Templates {
    pub fn new(server: &ServerConfig) -> Self {
        Self {
            instance_name: server.instance_name.clone(),
            base_url: server.base_url(),
        }
    }

    pub fn confirm_email(&self, username: &str, token: &str) -> EmailContent {
        EmailContent {
            kind: EmailKind::ConfirmEmail,
            subject: format!("{}: please confirm your email address", self.instance_name),
            body: format!(
                "Hi {username},\n\n\
                 Please confirm this address for your account on {name} by opening:\n\n\
                 {base}/confirm_email?token={token}\n\n\
                 If you did not request this, you can ignore this email.\n",
                name = self.instance_name,
                base = self.base_url,
            ),
        }
    }

    pub fn password_changed(&self, username: &str) -> EmailContent {
        EmailContent {
            kind: EmailKind::PasswordChanged,
            subject: format!("{}: your password was changed", self.instance_name),
            body: format!(
                "Hi {username},\n\n\
                 The password for your account on {name} was just changed.\n\
                 If this wasn't you, contact an administrator at {base} right away.\n",
                name = self.instance_name,
                base = self.base_url,
            ),
        }
    }

    pub fn signup_approved(&self, username: &str) -> EmailContent {
        EmailContent {
            kind: EmailKind::SignupApproved,
            subject: format!("{}: your account was approved", self.instance_name),
            body: format!(
                "Hi {username},\n\n\
                 Your sign-up on {name} was approved. You can log in at {base}.\n",
                name = self.instance_name,
                base = self.base_url,
            ),
        }
    }

    pub fn signup_rejected(&self, reason: Option<&str>) -> EmailContent {
        let reason = match reason {
            Some(reason) if !reason.trim().is_empty() => {
                format!("The moderators gave this reason:\n\n{reason}\n")
            }
            _ => String::new(),
        };
        EmailContent {
            kind: EmailKind::SignupRejected,
            subject: format!("{}: your sign-up was rejected", self.instance_name),
            body: format!(
                "Hello,\n\n\
                 Your sign-up request on {name} was rejected.\n{reason}",
                name = self.instance_name,
            ),
        }
    }

    pub fn report_closed(
        &self,
        username: &str,
        reported: &str,
        action_taken: Option<&str>,
    ) -> EmailContent {
        let outcome = action_taken
            .filter(|a| !a.trim().is_empty())
            .map(|a| format!("The moderators noted:\n\n{a}\n"))
            .unwrap_or_default();
        EmailContent {
            kind: EmailKind::ReportClosed,
            subject: format!("{}: your report was closed", self.instance_name),
            body: format!(
                "Hi {username},\n\n\
                 Your report about {reported} on {name} has been reviewed and closed.\n{outcome}",
                name = self.instance_name,
            ),
        }
    }

    /// To moderators. Domains are `None` for accounts on this instance.
    pub fn admin_report_opened(
        &self,
        report_id: &str,
        reporter_domain: Option<&str>,
        target_domain: Option<&str>,
    ) -> EmailContent {
        let reporter = reporter_domain.unwrap_or("this instance");
        let target = target_domain.unwrap_or("this instance");
        EmailContent {
            kind: EmailKind::AdminReportOpened,
            subject: format!("{}: new report", self.instance_name),
            body: format!(
                "Hello moderator,\n\n\
                 An account on {reporter} opened a report about an account on {target}.\n\n\
                 Review it at {base}/settings/moderation/reports/{report_id}\n",
                base = self.base_url,
            ),
        }
    }

    /// To moderators. `email` is the address the new user signed up with.
    pub fn admin_new_signup(&self, username: &str, email: &str, account_id: &str) -> EmailContent {
        EmailContent {
            kind: EmailKind::AdminNewSignup,
            subject: format!("{}: new sign-up", self.instance_name),
            body: format!(
                "Hello moderator,\n\n\
                 {username} ({email}) signed up on {name} and is waiting for approval.\n\n\
                 Review it at {base}/settings/moderation/accounts/{account_id}\n",
                name = self.instance_name,
                base = self.base_url,
            ),
        }
    }
}
