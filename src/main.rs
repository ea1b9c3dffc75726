//! theta-render demo
//!
//! Opens a window and drives the renderer with a synthetic level.
//! Tab opens the automap, P shows the title page, F12 saves a screenshot.

mod demo;

use log::{error, info};
use macroquad::prelude::*;

use demo::Demo;
use theta_render::config::{EngineConfig, load_config_or_default};
use theta_render::renderer::{GlRenderer, Renderer};
use theta_render::VERSION;

const CONFIG_PATH: &str = "theta-render.ron";

fn init_logging() {
    let default_level = if cfg!(debug_assertions) { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();
}

fn window_conf() -> Conf {
    let config = load_config_or_default(CONFIG_PATH);
    Conf {
        window_title: format!("theta-render v{}", VERSION),
        window_width: config.window_width,
        window_height: config.window_height,
        window_resizable: true,
        high_dpi: true,
        ..Default::default()
    }
}

fn fatal(context: &str, e: impl std::fmt::Display) -> ! {
    error!("{}: {}", context, e);
    std::process::exit(1);
}

#[macroquad::main(window_conf)]
async fn main() {
    init_logging();
    println!("=== theta-render v{} ===", VERSION);

    let config: EngineConfig = load_config_or_default(CONFIG_PATH);
    info!(
        "world {}x{}, atlas {}",
        config.world_width, config.world_height, config.atlas_size
    );

    let (mut width, mut height) = (screen_width() as i32, screen_height() as i32);
    let mut renderer = match GlRenderer::new(
        width,
        height,
        config.world_width,
        config.world_height,
        config.atlas_size,
    ) {
        Ok(r) => r,
        Err(e) => fatal("renderer", e),
    };

    let mut demo = match Demo::new(&config) {
        Ok(d) => d,
        Err(e) => fatal("demo setup", e),
    };
    demo.on_resolution_change(width, height);

    loop {
        let (w, h) = (screen_width() as i32, screen_height() as i32);
        if (w, h) != (width, height) && w > 0 && h > 0 {
            width = w;
            height = h;
            renderer.set_resolution(width, height);
            demo.on_resolution_change(width, height);
        }

        if !demo.handle_input() {
            break;
        }
        demo.update(get_frame_time() as f64);

        if is_key_pressed(KeyCode::F12) {
            demo.screenshot(width, height);
        }

        if let Err(e) = demo.draw(&mut renderer).and_then(|_| renderer.render()) {
            fatal("render", e);
        }

        next_frame().await;
    }
}
