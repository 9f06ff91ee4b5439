//! # Vulkan Context
//!
//! Graphics-context bootstrap for Vulkan: backend discovery, capability
//! negotiation, deterministic physical-device selection, and logical
//! device/queue acquisition, with an optional validation-layer diagnostic
//! channel and strict reverse-order teardown.
//!
//! What this crate deliberately does not do: rendering pipelines,
//! swapchains, or windowing abstractions. It takes a platform extension
//! list in and hands a device and a graphics queue back.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use vulkan_context::{ContextConfig, GraphicsContext, Window};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut window = Window::new("Vulkan Render Window", 800, 600, false)?;
//!
//!     let config = ContextConfig::new("Hello Triangle");
//!     let extensions = window.required_instance_extensions()?;
//!     let context = GraphicsContext::initialize(&config, &extensions)?;
//!
//!     while !window.should_close() {
//!         window.poll_events();
//!     }
//!
//!     context.shutdown();
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod capabilities;
pub mod config;
pub mod context;
pub mod device;
pub mod diagnostics;
pub mod instance;
pub mod logging;
pub mod physical;
pub mod window;

pub use capabilities::{CapabilityRegistry, VALIDATION_LAYER_NAME};
pub use config::{AppSettings, ConfigError, ContextConfig, FileConfig, WindowSettings};
pub use context::{ContextError, ContextResult, GraphicsContext};
pub use device::LogicalDevice;
pub use diagnostics::{
    Category, DebugMessenger, DiagnosticSink, DiagnosticsConfig, LogSink, Severity,
};
pub use instance::VulkanInstance;
pub use physical::{
    DeviceClass, DeviceFeatures, DeviceRequirements, PhysicalDeviceInfo, QueueFamilyInfo,
    QueueFamilySelection,
};
pub use window::{Window, WindowError, WindowResult};
