//! Compile the critical and deferred stylesheets.

use anyhow::{Context as _, Result};
use mezze_css::{BuildMode, CssCompiler};
use serde::Serialize;

use super::BuildCssArgs;
use crate::context::Context;
use crate::output::{format_bytes, savings_percent};

#[derive(Serialize)]
struct BuiltFile {
    output: String,
    input_bytes: usize,
    output_bytes: usize,
}

/// Run the build-css command.
pub async fn run(args: BuildCssArgs, ctx: &Context) -> Result<()> {
    let build = &ctx.config.build;
    let critical_src = ctx.resolve_path(args.critical.as_deref().unwrap_or(&build.critical_src));
    let deferred_src = ctx.resolve_path(args.deferred.as_deref().unwrap_or(&build.deferred_src));
    let out_dir = match args.out_dir.as_deref() {
        Some(dir) => ctx.resolve_path(dir),
        None => ctx.resolve_path(&build.public_dir).join("css"),
    };

    let mode = if args.dev {
        BuildMode::Development
    } else {
        BuildMode::Production
    };
    let compiler = CssCompiler::new(mode);
    let deferred_compiler = if args.no_banner {
        compiler.clone().without_banner()
    } else {
        compiler.clone()
    };

    let deferred_name = deferred_file_name(&ctx.config.site.css.deferred_href);

    ctx.output.header("Building CSS");
    ctx.output.debug(&format!("mode: {:?}", mode));

    ctx.output.step(1, 2, "Compiling deferred stylesheet");
    let deferred_out = out_dir.join(deferred_name);
    let deferred = deferred_compiler
        .compile_file(&deferred_src, &deferred_out)
        .with_context(|| format!("Failed to build {}", deferred_src.display()))?;

    ctx.output.step(2, 2, "Compiling critical stylesheet");
    let critical_out = out_dir.join("critical.css");
    let critical = compiler
        .without_banner()
        .compile_file(&critical_src, &critical_out)
        .with_context(|| format!("Failed to build {}", critical_src.display()))?;

    let built = vec![
        BuiltFile {
            output: deferred_out.display().to_string(),
            input_bytes: deferred.input_bytes,
            output_bytes: deferred.output_bytes(),
        },
        BuiltFile {
            output: critical_out.display().to_string(),
            input_bytes: critical.input_bytes,
            output_bytes: critical.output_bytes(),
        },
    ];

    if ctx.output.is_json() {
        ctx.output.json(&built);
        return Ok(());
    }

    for file in &built {
        ctx.output.success(&format!(
            "{} ({} -> {}, {:.1}% smaller)",
            file.output,
            format_bytes(file.input_bytes as u64),
            format_bytes(file.output_bytes as u64),
            savings_percent(file.input_bytes as u64, file.output_bytes as u64)
        ));
    }

    Ok(())
}

/// File name for the deferred stylesheet, taken from its public href.
fn deferred_file_name(href: &str) -> &str {
    href.rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
        .unwrap_or("deferred-styles.css")
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("/css/deferred-styles.css", "deferred-styles.css")]
    #[case("/styles/site.css", "site.css")]
    #[case("/css/", "deferred-styles.css")]
    fn test_deferred_file_name(#[case] href: &str, #[case] expected: &str) {
        assert_eq!(deferred_file_name(href), expected);
    }
}
