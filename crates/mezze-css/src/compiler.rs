//! Build-time stylesheet compilation.

use std::fs;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};

use crate::bundle::CriticalCssBundle;
use crate::error::CssError;

/// Output style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildMode {
    /// Pretty-printed, prefixed.
    Development,
    /// Minified, prefixed, comments removed.
    #[default]
    Production,
}

impl BuildMode {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Minimum browser versions to prefix for, as major versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrowserTargets {
    pub chrome: Option<u32>,
    pub edge: Option<u32>,
    pub firefox: Option<u32>,
    pub safari: Option<u32>,
    pub ios_saf: Option<u32>,
}

impl Default for BrowserTargets {
    fn default() -> Self {
        Self {
            chrome: Some(90),
            edge: Some(90),
            firefox: Some(88),
            safari: Some(14),
            ios_saf: Some(14),
        }
    }
}

impl BrowserTargets {
    fn to_targets(self) -> Targets {
        let version = |major: Option<u32>| major.map(|v| v << 16);
        Targets::from(Browsers {
            chrome: version(self.chrome),
            edge: version(self.edge),
            firefox: version(self.firefox),
            safari: version(self.safari),
            ios_saf: version(self.ios_saf),
            ..Browsers::default()
        })
    }
}

/// Result of compiling one stylesheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledCss {
    pub code: String,
    pub input_bytes: usize,
}

impl CompiledCss {
    pub fn output_bytes(&self) -> usize {
        self.code.len()
    }
}

/// Parses, prefixes and (in production) minifies stylesheets.
#[derive(Debug, Clone)]
pub struct CssCompiler {
    mode: BuildMode,
    targets: BrowserTargets,
    banner: bool,
}

impl CssCompiler {
    pub fn new(mode: BuildMode) -> Self {
        Self {
            mode,
            targets: BrowserTargets::default(),
            banner: true,
        }
    }

    pub fn with_targets(mut self, targets: BrowserTargets) -> Self {
        self.targets = targets;
        self
    }

    /// Skip the build banner. Used for CSS that gets inlined.
    pub fn without_banner(mut self) -> Self {
        self.banner = false;
        self
    }

    pub fn mode(&self) -> BuildMode {
        self.mode
    }

    pub fn compile(&self, source: &str, filename: &str) -> Result<CompiledCss, CssError> {
        self.compile_at(source, filename, Utc::now())
    }

    /// Compile with an explicit build timestamp for the banner.
    pub fn compile_at(
        &self,
        source: &str,
        filename: &str,
        built_at: DateTime<Utc>,
    ) -> Result<CompiledCss, CssError> {
        let options = ParserOptions {
            filename: filename.to_string(),
            ..ParserOptions::default()
        };
        let mut sheet = StyleSheet::parse(source, options).map_err(|e| CssError::Parse {
            file: filename.to_string(),
            message: e.to_string(),
        })?;

        // Prefixing happens in the minify pass; the printer decides layout.
        sheet
            .minify(MinifyOptions {
                targets: self.targets.to_targets(),
                ..MinifyOptions::default()
            })
            .map_err(|e| CssError::Minify {
                file: filename.to_string(),
                message: e.to_string(),
            })?;

        let printed = sheet
            .to_css(PrinterOptions {
                minify: self.mode.is_production(),
                targets: self.targets.to_targets(),
                ..PrinterOptions::default()
            })
            .map_err(|e| CssError::Print {
                file: filename.to_string(),
                message: e.to_string(),
            })?;

        let mut code = String::new();
        if self.banner {
            code.push_str(&banner(built_at));
            code.push('\n');
        }
        code.push_str(&printed.code);

        tracing::debug!(
            file = filename,
            input_bytes = source.len(),
            output_bytes = code.len(),
            "compiled stylesheet"
        );

        Ok(CompiledCss {
            code,
            input_bytes: source.len(),
        })
    }

    /// Compile `input` and write the result to `output`, creating parent
    /// directories as needed.
    pub fn compile_file(&self, input: &Path, output: &Path) -> Result<CompiledCss, CssError> {
        let source = fs::read_to_string(input).map_err(|source| CssError::Io {
            path: input.display().to_string(),
            source,
        })?;
        let compiled = self.compile(&source, &input.display().to_string())?;

        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent).map_err(|source| CssError::Io {
                path: parent.display().to_string(),
                source,
            })?;
        }
        fs::write(output, &compiled.code).map_err(|source| CssError::Io {
            path: output.display().to_string(),
            source,
        })?;

        Ok(compiled)
    }

    /// Compile both halves of a bundle. The critical half never carries a
    /// banner since it is inlined into every page.
    pub fn build_bundle(
        &self,
        critical_src: &str,
        deferred_src: &str,
    ) -> Result<CriticalCssBundle, CssError> {
        let critical = self
            .clone()
            .without_banner()
            .compile(critical_src, "critical.css")?;
        let deferred = self.compile(deferred_src, "deferred.css")?;
        Ok(CriticalCssBundle::new(critical.code, deferred.code))
    }
}

impl Default for CssCompiler {
    fn default() -> Self {
        Self::new(BuildMode::default())
    }
}

/// Banner comment placed at the top of built stylesheets.
pub fn banner(built_at: DateTime<Utc>) -> String {
    format!(
        "/* Built by mezze build-css - {} */",
        built_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    )
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rstest::rstest;

    use super::*;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_banner_format() {
        assert_eq!(
            banner(fixed_time()),
            "/* Built by mezze build-css - 2024-05-01T12:00:00Z */"
        );
    }

    #[test]
    fn test_production_minifies() {
        let compiler = CssCompiler::new(BuildMode::Production);
        let out = compiler
            .compile_at("/* note */\n.a {\n  color: red;\n}\n", "a.css", fixed_time())
            .unwrap();
        assert!(out.code.starts_with("/* Built by mezze build-css - 2024-05-01T12:00:00Z */\n"));
        assert!(out.code.contains(".a{color:red}"));
        assert!(!out.code.contains("note"));
        assert!(out.output_bytes() > 0);
    }

    #[test]
    fn test_development_pretty_prints() {
        let compiler = CssCompiler::new(BuildMode::Development).without_banner();
        let out = compiler.compile(".a{color:red}", "a.css").unwrap();
        assert!(out.code.contains("color: red"));
        assert!(!out.code.starts_with("/*"));
    }

    #[rstest]
    #[case(BuildMode::Development)]
    #[case(BuildMode::Production)]
    fn test_old_targets_get_prefixes(#[case] mode: BuildMode) {
        let targets = BrowserTargets {
            chrome: None,
            edge: None,
            firefox: None,
            safari: Some(9),
            ios_saf: None,
        };
        let compiler = CssCompiler::new(mode).with_targets(targets);
        let out = compiler.compile(".a{user-select:none}", "a.css").unwrap();
        assert!(out.code.contains("-webkit-user-select"));
    }

    #[test]
    fn test_development_prefixes_stay_pretty() {
        let targets = BrowserTargets {
            chrome: None,
            edge: None,
            firefox: None,
            safari: Some(9),
            ios_saf: None,
        };
        let compiler = CssCompiler::new(BuildMode::Development)
            .with_targets(targets)
            .without_banner();
        let out = compiler.compile(".a{user-select:none}", "a.css").unwrap();
        assert!(out.code.contains("-webkit-user-select: none"));
        assert!(out.code.contains('\n'));
    }

    #[test]
    fn test_invalid_selector_is_parse_error() {
        let err = CssCompiler::default()
            .compile("..a { color: red; }", "broken.css")
            .unwrap_err();
        match err {
            CssError::Parse { file, .. } => assert_eq!(file, "broken.css"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_build_bundle() {
        let bundle = CssCompiler::new(BuildMode::Production)
            .build_bundle(".lcp-text { font-weight: 700; }", ".btn { padding: 1rem; }")
            .unwrap();
        assert_eq!(bundle.critical(), ".lcp-text{font-weight:700}");
        assert!(bundle.deferred().starts_with("/* Built by mezze build-css"));
        assert!(bundle.deferred().contains(".btn{padding:1rem}"));
    }

    #[test]
    fn test_embedded_sources_compile() {
        let compiler = CssCompiler::new(BuildMode::Production);
        let bundle = compiler
            .build_bundle(
                crate::bundle::EMBEDDED_CRITICAL_CSS,
                crate::bundle::EMBEDDED_DEFERRED_CSS,
            )
            .unwrap();
        assert!(bundle.critical().contains(".lcp-text"));
        assert!(bundle.deferred().contains(".hero-section"));
    }

    #[test]
    fn test_compile_file_writes_output() {
        let dir = std::env::temp_dir().join(format!("mezze-css-{}", std::process::id()));
        let input = dir.join("in.css");
        let output = dir.join("out/deferred-styles.css");
        fs::create_dir_all(&dir).unwrap();
        fs::write(&input, ".a { color: blue; }").unwrap();

        let compiled = CssCompiler::new(BuildMode::Production)
            .compile_file(&input, &output)
            .unwrap();
        let written = fs::read_to_string(&output).unwrap();
        assert_eq!(written, compiled.code);
        assert!(written.contains(".a{color:#00f}") || written.contains(".a{color:blue}"));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_compile_file_missing_input() {
        let err = CssCompiler::default()
            .compile_file(Path::new("/nonexistent/in.css"), Path::new("/tmp/out.css"))
            .unwrap_err();
        assert!(matches!(err, CssError::Io { .. }));
    }
}
