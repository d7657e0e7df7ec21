//! Identity and mail configuration report.

use anyhow::{bail, Result};
use mezze_core::SiteConfig;
use mezze_mail::Mailer;
use serde::Serialize;

use super::EnvCheckArgs;
use crate::context::Context;
use crate::output::status_badge;

#[derive(Debug, Serialize, PartialEq, Eq)]
struct EnvReport {
    identity_ok: bool,
    identity_issue: Option<String>,
    mail_providers: Vec<&'static str>,
}

impl EnvReport {
    fn from_config(config: &SiteConfig) -> Self {
        let identity = config.identity.check();
        Self {
            identity_ok: identity.is_ok(),
            identity_issue: identity.err().map(|issue| issue.to_string()),
            mail_providers: Mailer::from_config(&config.mail).provider_names(),
        }
    }

    fn is_complete(&self) -> bool {
        self.identity_ok && !self.mail_providers.is_empty()
    }
}

/// Run the env-check command.
pub async fn run(args: EnvCheckArgs, ctx: &Context) -> Result<()> {
    let report = EnvReport::from_config(&ctx.config.site);

    if ctx.output.is_json() {
        ctx.output.json(&report);
    } else {
        ctx.output.header("Environment");

        ctx.output.kv(
            "identity",
            &status_badge(report.identity_ok, if report.identity_ok { "ok" } else { "missing" }),
        );
        if let Some(issue) = &report.identity_issue {
            ctx.output.warn(&format!("Identity: {}", issue));
            ctx.output
                .list_item("Set NEXT_PUBLIC_SUPABASE_URL and NEXT_PUBLIC_SUPABASE_ANON_KEY");
        }

        if report.mail_providers.is_empty() {
            ctx.output.kv("mail", &status_badge(false, "missing"));
            ctx.output
                .list_item("Set RESEND_API_KEY or SMTP_HOST, SMTP_PORT, SMTP_USER and SMTP_PASS");
        } else {
            ctx.output.kv(
                "mail",
                &status_badge(true, &report.mail_providers.join(" -> ")),
            );
        }
    }

    if args.strict && !report.is_complete() {
        bail!("Configuration incomplete");
    }
    Ok(())
}
