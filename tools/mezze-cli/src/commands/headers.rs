//! Show the headers the middleware produces for a path.

use std::sync::Arc;

use anyhow::Result;
use http::Method;
use mezze_cache::PolicyTable;
use mezze_core::RequestContext;
use mezze_middleware::{AnonymousIdentity, SiteMiddleware};
use serde::Serialize;

use super::HeadersArgs;
use crate::context::Context;

#[derive(Serialize)]
struct PathReport {
    path: String,
    status: u16,
    rule: Option<String>,
    headers: Vec<(String, String)>,
}

/// Run the headers command.
pub async fn run(args: HeadersArgs, ctx: &Context) -> Result<()> {
    let table = if ctx.config.cache_rules.is_empty() {
        PolicyTable::standard()?
    } else {
        PolicyTable::from_specs(ctx.config.cache_rules.clone())?
    };
    let table = Arc::new(table);
    let routes = Arc::new(ctx.config.site.routes.clone());
    let middleware = SiteMiddleware::new(AnonymousIdentity, Arc::clone(&table), routes);

    let mut reports = Vec::with_capacity(args.paths.len());
    for path in &args.paths {
        let mut request = RequestContext::new(Method::GET, path)
            .with_header("Accept-Encoding", &args.accept_encoding);
        let response = middleware.handle(&mut request).await?;

        let rule = table
            .resolve(&request.path)
            .map(|rule| format!("#{} {}", rule.priority, rule.description));
        reports.push(PathReport {
            path: path.clone(),
            status: response.status().as_u16(),
            rule,
            headers: response.headers.into_vec(),
        });
    }

    if ctx.output.is_json() {
        ctx.output.json(&reports);
        return Ok(());
    }

    for report in &reports {
        ctx.output.header(&format!("{} ({})", report.path, report.status));
        ctx.output
            .kv("rule", report.rule.as_deref().unwrap_or("none"));
        for (name, value) in &report.headers {
            ctx.output.kv(name, value);
        }
    }

    Ok(())
}
