//! External image optimizers.
//!
//! Animated images go through `gifsicle`, static images and pack icons
//! through `oxipng`. Both rewrite the file in place.

use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;

use qsticker_common::config::OptimizeConfig;
use tokio::process::Command;
use tracing::debug;

use crate::IngestError;

/// Role of an image inside a pack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    /// The pack icon, always a PNG.
    Icon,
    /// A full-size image of a static pack.
    Static,
    /// A full-size image of an animated pack.
    Animated,
}

/// A planned tool run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub program: String,
    pub args: Vec<OsString>,
}

/// Runs the configured optimizer for each downloaded image.
#[derive(Debug, Clone)]
pub struct ImageOptimizer {
    config: OptimizeConfig,
    threads: usize,
}

impl ImageOptimizer {
    #[must_use]
    pub fn new(config: OptimizeConfig) -> Self {
        let threads = std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get);
        Self { config, threads }
    }

    /// The tool run for an image, or `None` when its optimizer is disabled.
    #[must_use]
    pub fn plan(&self, kind: ImageKind, path: &Path) -> Option<ToolInvocation> {
        match kind {
            ImageKind::Animated => {
                let gif = &self.config.gif;
                if !gif.enable {
                    return None;
                }
                let mut args: Vec<OsString> = Vec::new();
                if gif.verbose {
                    args.push("--verbose".into());
                }
                args.push("--optimize=3".into());
                if let Some(lossy) = gif.lossy.flag() {
                    args.push(lossy.into());
                }
                args.push(format!("--threads={}", self.threads).into());
                args.push("--output".into());
                args.push(path.into());
                args.push(path.into());
                Some(ToolInvocation {
                    program: gif.program.clone(),
                    args,
                })
            }
            ImageKind::Icon | ImageKind::Static => {
                let png = &self.config.png;
                if !png.enable {
                    return None;
                }
                let mut args: Vec<OsString> = Vec::new();
                if png.verbose {
                    args.push("--verbose".into());
                    args.push("--verbose".into());
                }
                args.extend(["--opt".into(), "max".into(), path.into()]);
                Some(ToolInvocation {
                    program: png.program.clone(),
                    args,
                })
            }
        }
    }

    /// Optimize an image in place. Returns whether a tool ran.
    pub async fn optimize(&self, kind: ImageKind, path: &Path) -> Result<bool, IngestError> {
        let Some(invocation) = self.plan(kind, path) else {
            return Ok(false);
        };

        debug!(program = %invocation.program, path = %path.display(), "Running optimizer");

        let status = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| IngestError::Tool {
                tool: invocation.program.clone(),
                reason: e.to_string(),
            })?;

        if !status.success() {
            return Err(IngestError::Tool {
                tool: invocation.program,
                reason: status.to_string(),
            });
        }
        Ok(true)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use qsticker_common::config::{GifLossy, GifOptimizeConfig, PngOptimizeConfig};

    fn optimizer(png: bool, gif: bool, verbose: bool, lossy: GifLossy) -> ImageOptimizer {
        ImageOptimizer {
            config: OptimizeConfig {
                png: PngOptimizeConfig {
                    enable: png,
                    verbose,
                    program: "oxipng".to_string(),
                },
                gif: GifOptimizeConfig {
                    enable: gif,
                    verbose,
                    lossy,
                    program: "gifsicle".to_string(),
                },
            },
            threads: 8,
        }
    }

    fn args(invocation: &ToolInvocation) -> Vec<&str> {
        invocation
            .args
            .iter()
            .map(|a| a.to_str().unwrap())
            .collect()
    }

    #[test]
    fn test_gif_plan() {
        let opt = optimizer(false, true, false, GifLossy::Level(30));
        let plan = opt.plan(ImageKind::Animated, Path::new("/tmp/a")).unwrap();

        assert_eq!(plan.program, "gifsicle");
        assert_eq!(
            args(&plan),
            ["--optimize=3", "--lossy=30", "--threads=8", "--output", "/tmp/a", "/tmp/a"]
        );
    }

    #[test]
    fn test_gif_plan_verbose_with_default_lossy() {
        let opt = optimizer(false, true, true, GifLossy::Enabled(true));
        let plan = opt.plan(ImageKind::Animated, Path::new("/tmp/a")).unwrap();

        assert_eq!(
            args(&plan),
            ["--verbose", "--optimize=3", "--lossy", "--threads=8", "--output", "/tmp/a", "/tmp/a"]
        );
    }

    #[test]
    fn test_png_plan_covers_icons_and_static_images() {
        let opt = optimizer(true, false, true, GifLossy::default());

        for kind in [ImageKind::Icon, ImageKind::Static] {
            let plan = opt.plan(kind, Path::new("/tmp/b")).unwrap();
            assert_eq!(plan.program, "oxipng");
            assert_eq!(args(&plan), ["--verbose", "--verbose", "--opt", "max", "/tmp/b"]);
        }
        // Animated images never go through the PNG optimizer
        assert!(opt.plan(ImageKind::Animated, Path::new("/tmp/b")).is_none());
    }

    #[test]
    fn test_disabled_optimizers_plan_nothing() {
        let opt = optimizer(false, false, false, GifLossy::default());
        assert!(opt.plan(ImageKind::Icon, Path::new("x")).is_none());
        assert!(opt.plan(ImageKind::Animated, Path::new("x")).is_none());
    }

    #[tokio::test]
    async fn test_failing_tool_is_an_error() {
        let mut opt = optimizer(true, false, false, GifLossy::default());
        opt.config.png.program = "false".to_string();

        let err = opt.optimize(ImageKind::Static, Path::new("x")).await.unwrap_err();
        assert!(matches!(err, IngestError::Tool { ref tool, .. } if tool == "false"));
    }

    #[tokio::test]
    async fn test_missing_tool_is_an_error() {
        let mut opt = optimizer(true, false, false, GifLossy::default());
        opt.config.png.program = "qsticker-no-such-optimizer".to_string();

        assert!(matches!(
            opt.optimize(ImageKind::Icon, Path::new("x")).await,
            Err(IngestError::Tool { .. })
        ));
    }

    #[tokio::test]
    async fn test_successful_tool_runs() {
        let mut opt = optimizer(true, false, false, GifLossy::default());
        opt.config.png.program = "true".to_string();

        assert!(opt.optimize(ImageKind::Static, Path::new("x")).await.unwrap());
        assert!(!opt.optimize(ImageKind::Animated, Path::new("x")).await.unwrap());
    }
}
