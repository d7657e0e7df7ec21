//! Request routing.

use std::sync::Arc;

use chrono::Utc;
use http::Method;
use mezze_cache::{compress, header_names, CompressionLevel, ContentEncoding, HeaderSet};
use mezze_core::{RequestContext, SiteConfig};
use mezze_css::CriticalCssBundle;
use mezze_middleware::MiddlewareResponse;
use mezze_seo::{
    render_image_sitemap, render_sitemap, standard_image_pages, standard_pages,
    IMAGE_SITEMAP_PATH, SITEMAP_CACHE_CONTROL, SITEMAP_CONTENT_TYPE, SITEMAP_PATH,
};

use crate::assets::AssetStore;
use crate::error::SiteError;
use crate::pages::PageCatalog;

const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";
const CSS_CONTENT_TYPE: &str = "text/css; charset=utf-8";

/// Response produced by a route, before encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteResponse {
    pub status: u16,
    pub headers: HeaderSet,
    pub body: Vec<u8>,
    /// Encoding the body is already in.
    pub encoding: ContentEncoding,
}

impl RouteResponse {
    fn new(status: u16, content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        let mut headers = HeaderSet::new();
        headers.set(header_names::CONTENT_TYPE, content_type);
        Self {
            status,
            headers,
            body: body.into(),
            encoding: ContentEncoding::Identity,
        }
    }
}

/// Response ready to hand to the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalResponse {
    pub status: u16,
    pub headers: HeaderSet,
    pub body: Vec<u8>,
}

/// The restaurant site.
pub struct Site<A> {
    config: Arc<SiteConfig>,
    pages: PageCatalog,
    assets: A,
}

impl<A: AssetStore> Site<A> {
    pub fn new(config: Arc<SiteConfig>, bundle: CriticalCssBundle, assets: A) -> Self {
        let pages = PageCatalog::new(&config, bundle);
        Self {
            config,
            pages,
            assets,
        }
    }

    pub fn pages(&self) -> &PageCatalog {
        &self.pages
    }

    /// Produce the final response for a request the middleware has processed.
    pub fn respond(
        &self,
        ctx: &RequestContext,
        middleware: &MiddlewareResponse,
    ) -> Result<FinalResponse, SiteError> {
        let mut headers = HeaderSet::new();
        headers.set(header_names::X_REQUEST_ID, ctx.request_id.to_string());

        if middleware.is_redirect() {
            headers.merge(middleware.headers.clone());
            return Ok(FinalResponse {
                status: middleware.status().as_u16(),
                headers,
                body: Vec::new(),
            });
        }

        // Only encode when the middleware advertised an encoding.
        let encoding = if middleware.headers.contains(header_names::CONTENT_ENCODING) {
            middleware.encoding
        } else {
            ContentEncoding::Identity
        };

        let routed = self.route(ctx, encoding)?;
        headers.merge(routed.headers);
        headers.merge(middleware.headers.clone());

        let body = if ctx.method == Method::HEAD {
            Vec::new()
        } else if routed.encoding == encoding {
            routed.body
        } else {
            compress(&routed.body, encoding, CompressionLevel::RUNTIME)?
        };

        Ok(FinalResponse {
            status: routed.status,
            headers,
            body,
        })
    }

    /// Resolve `ctx.path` to content. `encoding` is the preferred stored
    /// encoding for static assets.
    pub fn route(
        &self,
        ctx: &RequestContext,
        encoding: ContentEncoding,
    ) -> Result<RouteResponse, SiteError> {
        if ctx.method != Method::GET && ctx.method != Method::HEAD {
            let mut response =
                RouteResponse::new(405, "text/plain; charset=utf-8", "Method Not Allowed");
            response.headers.set("Allow", "GET, HEAD");
            return Ok(response);
        }

        let path = ctx.path.as_str();
        let site = &self.config.site;

        if path == SITEMAP_PATH || path == IMAGE_SITEMAP_PATH {
            let xml = if path == SITEMAP_PATH {
                render_sitemap(site, &standard_pages(), Utc::now())
            } else {
                render_image_sitemap(site, &standard_image_pages(), Utc::now())
            };
            let mut response = RouteResponse::new(200, SITEMAP_CONTENT_TYPE, xml);
            response
                .headers
                .set(header_names::CACHE_CONTROL, SITEMAP_CACHE_CONTROL);
            return Ok(response);
        }

        if let Some(html) = self.pages.render(path) {
            return Ok(RouteResponse::new(200, HTML_CONTENT_TYPE, html));
        }

        if let Some(asset) = self.assets.load(path, encoding)? {
            let mut response = RouteResponse::new(200, asset.content_type, asset.body);
            response.encoding = asset.encoding;
            return Ok(response);
        }

        if path == self.config.css.deferred_href {
            return Ok(RouteResponse::new(
                200,
                CSS_CONTENT_TYPE,
                self.pages.bundle().deferred(),
            ));
        }

        tracing::debug!(path, "no route");
        Ok(RouteResponse::new(404, HTML_CONTENT_TYPE, self.pages.render_not_found()))
    }
}
