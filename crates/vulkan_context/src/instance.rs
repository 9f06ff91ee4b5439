//! Backend connection factory
//!
//! Creates and owns the Vulkan instance, with the capability registry
//! checked up front and the diagnostic channel wired into the create call
//! itself so that creation-time messages are not lost.

use std::ffi::{CStr, CString};

use ash::{vk, Entry, Instance};

use crate::capabilities::{self, CapabilityRegistry};
use crate::config::ContextConfig;
use crate::context::{ContextError, ContextResult};
use crate::diagnostics::{self, DebugMessenger, DiagnosticSink, SinkHolder};

/// Owning wrapper around the Vulkan entry point and instance.
///
/// Exactly one of these exists per graphics context; everything later in
/// the bootstrap borrows from it and must be gone before it drops.
pub struct VulkanInstance {
    /// Vulkan entry point
    pub entry: Entry,
    /// Vulkan instance handle
    pub instance: Instance,
    diagnostics: DebugMessenger,
}

impl VulkanInstance {
    /// Establish the backend connection.
    ///
    /// When diagnostics are enabled in `config`, the registry's required
    /// layers are checked against the globally available layer list by
    /// exact match before any creation call, and a messenger create info
    /// is chained into the instance create request.
    pub fn new(
        config: &ContextConfig,
        registry: &CapabilityRegistry,
        sink: Box<dyn DiagnosticSink>,
    ) -> ContextResult<Self> {
        let entry = unsafe { Entry::load() }
            .map_err(|e| ContextError::LoaderUnavailable(format!("{:?}", e)))?;

        let diagnostics_enabled = config.diagnostics_enabled();

        // Pre-flight: fail on a missing layer before touching the create call.
        let available = entry
            .enumerate_instance_layer_properties()
            .map_err(ContextError::Api)?;
        let available_names = capabilities::layer_properties_names(&available);
        if let Some(missing) =
            capabilities::find_missing_layer(registry.required_layers(), &available_names)
        {
            return Err(ContextError::MissingCapability(
                missing.to_string_lossy().into_owned(),
            ));
        }

        if diagnostics_enabled {
            log_available_extensions(&entry);
        }

        let app_name = CString::new(config.application_name.as_str()).unwrap();
        let engine_name = CString::new(config.engine_name.as_str()).unwrap();
        let app_info = vk::ApplicationInfo::builder()
            .application_name(&app_name)
            .application_version(config.vk_application_version())
            .engine_name(&engine_name)
            .engine_version(config.vk_engine_version())
            .api_version(config.vk_api_version());

        let extension_ptrs = registry.extension_name_ptrs();
        let layer_ptrs = registry.layer_name_ptrs();

        let holder = Box::new(SinkHolder { sink });
        let mut messenger_info =
            diagnostics::messenger_create_info(&config.diagnostics_config, &holder);

        let mut create_info = vk::InstanceCreateInfo::builder()
            .application_info(&app_info)
            .enabled_extension_names(&extension_ptrs)
            .enabled_layer_names(&layer_ptrs);
        if diagnostics_enabled {
            // Chained, not installed: this captures messages emitted while
            // the instance itself is being created.
            create_info = create_info.push_next(&mut messenger_info);
        }

        let instance = unsafe { entry.create_instance(&create_info, None) }
            .map_err(ContextError::ConnectionCreationFailed)?;
        log::info!("Vulkan instance created");

        let diagnostics = if diagnostics_enabled {
            match DebugMessenger::install(&entry, &instance, &config.diagnostics_config, holder) {
                Ok(messenger) => messenger,
                Err(e) => {
                    // Don't leak the instance we just created.
                    unsafe { instance.destroy_instance(None) };
                    return Err(e);
                }
            }
        } else {
            DebugMessenger::disabled()
        };

        Ok(Self {
            entry,
            instance,
            diagnostics,
        })
    }

    /// Whether the diagnostic channel is currently installed
    pub fn diagnostics_installed(&self) -> bool {
        self.diagnostics.is_installed()
    }

    /// Uninstall the diagnostic channel ahead of instance teardown.
    /// Idempotent; dropping the instance does this automatically.
    pub fn uninstall_diagnostics(&mut self) {
        self.diagnostics.uninstall();
    }
}

impl Drop for VulkanInstance {
    fn drop(&mut self) {
        // Messenger must go before the instance that owns it.
        self.diagnostics.uninstall();
        unsafe {
            self.instance.destroy_instance(None);
        }
        log::debug!("Vulkan instance destroyed");
    }
}

fn log_available_extensions(entry: &Entry) {
    match entry.enumerate_instance_extension_properties(None) {
        Ok(properties) => {
            log::debug!("{} instance extensions available:", properties.len());
            for ext in &properties {
                let name = unsafe { CStr::from_ptr(ext.extension_name.as_ptr()) };
                log::debug!("  {}", name.to_string_lossy());
            }
        }
        Err(e) => log::warn!("could not enumerate instance extensions: {:?}", e),
    }
}
