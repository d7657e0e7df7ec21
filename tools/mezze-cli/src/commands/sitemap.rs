//! Write the XML sitemaps.

use std::fs;

use anyhow::{Context as _, Result};
use chrono::Utc;
use mezze_seo::{
    render_image_sitemap, render_sitemap, standard_image_pages, standard_pages,
    IMAGE_SITEMAP_PATH, SITEMAP_PATH,
};

use super::SitemapArgs;
use crate::context::Context;

/// Run the sitemap command.
pub async fn run(args: SitemapArgs, ctx: &Context) -> Result<()> {
    let site = &ctx.config.site.site;
    let now = Utc::now();
    let documents = [
        (SITEMAP_PATH, render_sitemap(site, &standard_pages(), now)),
        (
            IMAGE_SITEMAP_PATH,
            render_image_sitemap(site, &standard_image_pages(), now),
        ),
    ];

    if args.stdout {
        for (_, xml) in &documents {
            println!("{}", xml);
        }
        return Ok(());
    }

    let out_dir = ctx.resolve_path(args.out_dir.as_deref().unwrap_or(&ctx.config.build.public_dir));
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    ctx.output.header("Writing sitemaps");
    ctx.output.kv("base_url", &site.base_url);
    for (path, xml) in &documents {
        let file = out_dir.join(path.trim_start_matches('/'));
        fs::write(&file, xml).with_context(|| format!("Failed to write {}", file.display()))?;
        ctx.output.success(&file.display().to_string());
    }

    Ok(())
}
