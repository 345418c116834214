use clap::Parser;
use std::path::PathBuf;

pub const HELP_KEYS: &str = "\
Key Bindings:
  Esc / q           : Quit
  h                 : Print this help
  u                 : Toggle HUD (info in the window title)
  Arrows            : Pan image
  p / m             : Zoom in / out
  z (held) + Wheel  : Zoom
  Wheel             : Contrast center
  Shift + Wheel     : Contrast radius
  Shift + Motion    : Contrast center from the pixel under the cursor
  e / d             : Contrast radius up / down
  c                 : Reset contrast to the image range
  r                 : Reset zoom, pan and contrast
  1                 : Toggle flow coloring
  Left drag         : Pan
  Right drag        : Mark a region (rectangle printed on release)
  Space / Backspace : Next / previous image
";

/// Fallback image shown when no paths are given on the command line.
pub const DEFAULT_IMAGE: &str = "default.png";

#[derive(Parser)]
#[command(name = "fv", about = "A viewer for float-valued images", after_help = HELP_KEYS)]
pub struct Cli {
    /// Image files to view (the first is shown initially)
    pub paths: Vec<PathBuf>,

    /// Start with flow coloring enabled
    #[arg(long)]
    pub flow: bool,

    /// Start with the window-title HUD disabled
    #[arg(long)]
    pub no_hud: bool,
}

/// Resolve the image list: explicit paths win, otherwise fall back to
/// `DEFAULT_IMAGE` in the working directory if it exists.
pub fn resolve_paths(cli_paths: Vec<PathBuf>) -> Option<Vec<PathBuf>> {
    if !cli_paths.is_empty() {
        return Some(cli_paths);
    }
    let fallback = PathBuf::from(DEFAULT_IMAGE);
    if fallback.is_file() {
        log::warn!("no paths given, showing {}", DEFAULT_IMAGE);
        Some(vec![fallback])
    } else {
        None
    }
}
