//! East @ West restaurant site - Spin HTTP component.
//!
//! Every request runs through `SiteMiddleware` (identity refresh, login
//! redirects, cache and compression headers) before `Site` renders the page,
//! sitemap or static file. Static files are mounted at `/` from `public/`.

mod identity;
mod transport;

use std::sync::Arc;

use anyhow::Result;
use futures::SinkExt;
use spin_sdk::http::{Fields, IncomingRequest, Method, OutgoingResponse, ResponseOutparam};
use spin_sdk::http_component;

use mezze_cache::{header_names, HeaderSet, PolicyTable};
use mezze_core::{RequestContext, SiteConfig};
use mezze_css::CriticalCssBundle;
use mezze_middleware::{MiddlewareError, SiteMiddleware};
use mezze_observability::{init_tracing, LogFormat, StructuredLogger};
use mezze_site::{FinalResponse, FsAssetStore, Site, SiteError};

use identity::SiteIdentity;

const WORKLOAD: &str = "restaurant-site";

/// Root of the files mounted by `spin.toml`.
const ASSET_ROOT: &str = "/";

/// Site request handler.
#[http_component]
async fn handle_site(req: IncomingRequest, response_out: ResponseOutparam) {
    // Each instance is fresh; a second init is harmless.
    let _ = init_tracing(LogFormat::Json, "info");

    let mut ctx = request_context(&req);
    let logger = StructuredLogger::new(ctx.request_id.clone())
        .with_workload(WORKLOAD)
        .with_route(ctx.path.clone());

    let response = match serve(&mut ctx, &logger).await {
        Ok(response) => {
            logger
                .info_builder("request served")
                .field_i64("status", i64::from(response.status))
                .field(
                    "encoding",
                    response
                        .headers
                        .get(header_names::CONTENT_ENCODING)
                        .unwrap_or("identity"),
                )
                .field_i64("bytes", response.body.len() as i64)
                .emit();
            response
        }
        Err(err) => {
            let status = err
                .downcast_ref::<SiteError>()
                .map(SiteError::status_code)
                .unwrap_or(500);
            logger
                .error_builder("request failed")
                .field("error", format!("{:#}", err))
                .field_i64("status", i64::from(status))
                .emit();
            error_response(&ctx, status)
        }
    };

    send_response(response_out, response).await;
}

async fn serve(ctx: &mut RequestContext, logger: &StructuredLogger) -> Result<FinalResponse> {
    let config = SiteConfig::default().with_env();
    config.routes.validate()?;
    let config = Arc::new(config);

    let identity = SiteIdentity::from_config(&config.identity);
    if !identity.is_configured() {
        logger.debug("identity backend not configured, serving anonymously");
    }

    let middleware = SiteMiddleware::new(
        identity,
        Arc::new(PolicyTable::standard()?),
        Arc::new(config.routes.clone()),
    )
    .with_observer(Arc::new(logger.clone()));

    let outcome = match middleware.handle(ctx).await {
        Ok(outcome) => outcome,
        Err(err) => {
            if let MiddlewareError::Identity(cause) = &err {
                logger
                    .warn_builder("identity backend unavailable")
                    .field("error", cause.to_string())
                    .field("source", if cause.is_upstream() { "upstream" } else { "request" })
                    .emit();
            }
            return Err(SiteError::from(err).into());
        }
    };
    logger.phase(outcome.phase);

    let site = Site::new(
        Arc::clone(&config),
        CriticalCssBundle::embedded(),
        FsAssetStore::new(ASSET_ROOT),
    );
    Ok(site.respond(ctx, &outcome)?)
}

/// Build the request context from the incoming Spin request.
fn request_context(req: &IncomingRequest) -> RequestContext {
    let path = req.path_with_query().unwrap_or_else(|| "/".to_string());
    let mut ctx = RequestContext::new(http_method(&req.method()), path);
    for (name, value) in req.headers().entries() {
        let value = String::from_utf8_lossy(&value);
        ctx = ctx.with_header(&name, &value);
    }
    ctx
}

fn http_method(method: &Method) -> http::Method {
    match method {
        Method::Get => http::Method::GET,
        Method::Head => http::Method::HEAD,
        Method::Post => http::Method::POST,
        Method::Put => http::Method::PUT,
        Method::Delete => http::Method::DELETE,
        Method::Patch => http::Method::PATCH,
        Method::Options => http::Method::OPTIONS,
        Method::Connect => http::Method::CONNECT,
        Method::Trace => http::Method::TRACE,
        Method::Other(other) => {
            http::Method::from_bytes(other.as_bytes()).unwrap_or(http::Method::GET)
        }
    }
}

fn error_response(ctx: &RequestContext, status: u16) -> FinalResponse {
    let mut headers = HeaderSet::new();
    headers.set(header_names::CONTENT_TYPE, "text/plain; charset=utf-8");
    headers.set(header_names::CACHE_CONTROL, "no-store");
    headers.set(header_names::X_REQUEST_ID, ctx.request_id.to_string());
    let body = match status {
        503 => "Service Unavailable",
        _ => "Internal Server Error",
    };
    FinalResponse {
        status,
        headers,
        body: body.as_bytes().to_vec(),
    }
}

async fn send_response(response_out: ResponseOutparam, response: FinalResponse) {
    let header_list: Vec<(String, Vec<u8>)> = response
        .headers
        .into_iter()
        .map(|(name, value)| (name.to_ascii_lowercase(), value.into_bytes()))
        .collect();

    let headers = match Fields::from_list(&header_list) {
        Ok(headers) => headers,
        Err(e) => {
            tracing::error!(error = ?e, "invalid response headers");
            let outgoing = OutgoingResponse::new(Fields::new());
            let _ = outgoing.set_status_code(500);
            response_out.set(outgoing);
            return;
        }
    };

    let outgoing = OutgoingResponse::new(headers);
    if outgoing.set_status_code(response.status).is_err() {
        tracing::warn!(status = response.status, "invalid status code");
    }

    let mut body = outgoing.take_body();
    response_out.set(outgoing);
    if response.body.is_empty() {
        return;
    }
    if let Err(e) = body.send(response.body).await {
        tracing::warn!(error = %e, "failed to write response body");
    }
}
