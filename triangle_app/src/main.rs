//! Bootstrap demo application
//!
//! Opens a window, brings up the Vulkan graphics context, and polls
//! events until the window is closed. Nothing is drawn; the point is the
//! bootstrap and the teardown around it.

use std::path::Path;

use vulkan_context::{AppSettings, FileConfig, GraphicsContext, Window};

const SETTINGS_PATH: &str = "settings.toml";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let settings = if Path::new(SETTINGS_PATH).exists() {
        AppSettings::load_from_file(SETTINGS_PATH)?
    } else {
        AppSettings::default()
    };

    log::info!("Starting {}", settings.context.application_name);

    match run(&settings) {
        Ok(()) => {
            log::info!("Shutdown complete");
            Ok(())
        }
        Err(e) => {
            log::error!("Fatal: {}", e);
            Err(e)
        }
    }
}

fn run(settings: &AppSettings) -> Result<(), Box<dyn std::error::Error>> {
    let mut window = Window::new(
        &settings.window.title,
        settings.window.width,
        settings.window.height,
        settings.window.resizable,
    )?;

    let platform_extensions = window.required_instance_extensions()?;
    let context = GraphicsContext::initialize(&settings.context, &platform_extensions)?;
    log::info!(
        "Using {} (graphics queue family {})",
        context.physical_device().name(),
        context.graphics_queue_family()
    );

    while !window.should_close() {
        window.poll_events();

        let events: Vec<_> = window.flush_events().collect();
        for (_, event) in events {
            if let glfw::WindowEvent::Key(glfw::Key::Escape, _, glfw::Action::Press, _) = event {
                window.set_should_close(true);
            }
        }
    }

    context.shutdown();
    Ok(())
}
