//! Graphics-context bootstrap and teardown
//!
//! Ties the capability registry, the instance factory, device selection,
//! and logical-device creation together into one owning context with
//! reverse-creation-order teardown.

use ash::vk;
use thiserror::Error;

use crate::capabilities::CapabilityRegistry;
use crate::config::ContextConfig;
use crate::device::LogicalDevice;
use crate::diagnostics::{DiagnosticSink, LogSink};
use crate::instance::VulkanInstance;
use crate::physical::{self, PhysicalDeviceInfo};

/// Bootstrap error types
///
/// Every variant is terminal at this layer: the driver state does not
/// change within a process invocation, so nothing here is retried.
#[derive(Error, Debug)]
pub enum ContextError {
    /// The Vulkan loader library could not be found or loaded
    #[error("failed to load the Vulkan library: {0}")]
    LoaderUnavailable(String),

    /// A required layer or extension is absent from the backend
    #[error("required capability not available: {0}")]
    MissingCapability(String),

    /// The backend rejected instance creation
    #[error("instance creation failed: {0:?}")]
    ConnectionCreationFailed(vk::Result),

    /// The loader does not expose the debug utils entry points
    #[error("debug utils entry points are not exposed by this Vulkan loader")]
    UnsupportedDiagnostics,

    /// The backend rejected debug messenger creation
    #[error("debug messenger creation rejected: {0:?}")]
    DiagnosticsRejected(vk::Result),

    /// Physical device enumeration returned nothing
    #[error("no Vulkan-capable physical devices found")]
    NoDevicesFound,

    /// No enumerated device passed all requirement predicates
    #[error("no physical device satisfies the device requirements")]
    NoSuitableDevice,

    /// The backend rejected logical device creation
    #[error("logical device creation failed: {0:?}")]
    ContextCreationFailed(vk::Result),

    /// The configuration failed validation before any backend call
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// General Vulkan API error from a query call
    #[error("Vulkan API error: {0:?}")]
    Api(vk::Result),
}

/// Result type for bootstrap operations
pub type ContextResult<T> = Result<T, ContextError>;

/// Owning graphics context: selected device snapshot, logical device, and
/// the instance they both depend on.
///
/// Teardown order is encoded in the field order: `device` drops before
/// `instance`, and the instance uninstalls its diagnostic channel before
/// destroying itself.
pub struct GraphicsContext {
    physical_device: PhysicalDeviceInfo,
    device: LogicalDevice,
    instance: VulkanInstance,
}

impl GraphicsContext {
    /// Bring up the full graphics context with the default log-routed
    /// diagnostic sink.
    ///
    /// `platform_extensions` is the extension name list the windowing
    /// collaborator requires at startup (see [`crate::Window::required_instance_extensions`]).
    pub fn initialize(
        config: &ContextConfig,
        platform_extensions: &[String],
    ) -> ContextResult<Self> {
        Self::initialize_with_sink(config, platform_extensions, Box::new(LogSink))
    }

    /// Bring up the full graphics context, routing backend diagnostics to
    /// a host-provided sink.
    ///
    /// Creation order is instance → diagnostics → device selection →
    /// logical device. Any failure releases everything acquired so far in
    /// reverse order before returning.
    pub fn initialize_with_sink(
        config: &ContextConfig,
        platform_extensions: &[String],
        sink: Box<dyn DiagnosticSink>,
    ) -> ContextResult<Self> {
        config.validate().map_err(ContextError::InvalidConfiguration)?;

        let diagnostics_enabled = config.diagnostics_enabled();
        log::info!(
            "initializing graphics context for {} (diagnostics: {})",
            config.application_name,
            diagnostics_enabled
        );

        let registry = CapabilityRegistry::new(platform_extensions, diagnostics_enabled);
        let instance = VulkanInstance::new(config, &registry, sink)?;

        let devices = physical::enumerate_devices(&instance.instance)?;
        let selected = physical::select_first_suitable(&devices, &config.device_requirements)?.clone();

        let selection = selected.find_graphics_family();
        let device = LogicalDevice::new(
            &instance.instance,
            &selected,
            &selection,
            &registry,
            &config.device_requirements.features,
        )?;

        log::info!(
            "graphics context ready ({}, queue family {})",
            selected.name(),
            device.graphics_family()
        );

        Ok(Self {
            physical_device: selected,
            device,
            instance,
        })
    }

    /// Tear the context down in reverse creation order.
    ///
    /// Dropping the context has the same effect; this method exists so the
    /// application lifecycle has an explicit shutdown point to call.
    pub fn shutdown(self) {
        log::info!("shutting down graphics context");
        // Drop runs here: logical device first, then diagnostics, then
        // the instance (field declaration order).
    }

    /// Snapshot of the selected physical device
    pub fn physical_device(&self) -> &PhysicalDeviceInfo {
        &self.physical_device
    }

    /// The logical device
    pub fn device(&self) -> &LogicalDevice {
        &self.device
    }

    /// The owning Vulkan instance
    pub fn instance(&self) -> &VulkanInstance {
        &self.instance
    }

    /// The graphics submission queue
    pub fn graphics_queue(&self) -> vk::Queue {
        self.device.graphics_queue
    }

    /// Index of the queue family the graphics queue was created from
    pub fn graphics_queue_family(&self) -> u32 {
        self.device.graphics_family()
    }
}
