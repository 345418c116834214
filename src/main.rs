mod cache;
mod cli;
mod loader;
mod view;

use clap::Parser;
use std::sync::Arc;
use winit::event_loop::EventLoop;

use crate::cli::Cli;
use crate::view::App;
use crate::view::state::ViewportContext;

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let Some(files) = cli::resolve_paths(cli.paths) else {
        eprintln!("No images to show. Usage: fv <image>...");
        std::process::exit(1);
    };

    let first = match loader::load_image(&files[0]) {
        Ok(image) => Arc::new(image),
        Err(err) => {
            log::error!("{err}");
            std::process::exit(1);
        }
    };
    log::info!(
        "loaded {} ({}x{}, {} channel(s), range {:.3}..{:.3})",
        files[0].display(),
        first.width,
        first.height,
        first.channels,
        first.v_min,
        first.v_max
    );

    let ctx = ViewportContext::new(files, first, cli.flow, !cli.no_hud);

    let event_loop = EventLoop::new().expect("create event loop");
    let mut app = App::new(ctx);
    event_loop.run_app(&mut app).expect("run event loop");
}
