//! Logical device creation
//!
//! Materializes the executable device context bound to one queue family
//! and retrieves the submission queue handle.

use ash::{vk, Device, Instance};

use crate::capabilities::CapabilityRegistry;
use crate::context::{ContextError, ContextResult};
use crate::physical::{DeviceFeatures, PhysicalDeviceInfo, QueueFamilySelection};

/// Logical device wrapper with RAII cleanup
pub struct LogicalDevice {
    /// Vulkan logical device handle
    pub device: Device,
    /// Graphics operations queue, retrieved at index 0 of the chosen
    /// family and valid for the device's lifetime
    pub graphics_queue: vk::Queue,
    graphics_family: u32,
}

impl LogicalDevice {
    /// Create the logical device over the selected physical device.
    ///
    /// Requests exactly one queue at priority 1.0 from the selected
    /// family, the features named in `features`, and the registry's
    /// required layers (ignored by modern drivers, kept for older
    /// loaders).
    ///
    /// # Panics
    ///
    /// Panics when `selection` is incomplete. Passing an unselected queue
    /// family here is a caller bug, not a recoverable condition.
    pub fn new(
        instance: &Instance,
        physical_device: &PhysicalDeviceInfo,
        selection: &QueueFamilySelection,
        registry: &CapabilityRegistry,
        features: &DeviceFeatures,
    ) -> ContextResult<Self> {
        let graphics_family = selection
            .graphics_index()
            .expect("queue family selection must be complete before device creation");

        let priorities = [1.0_f32];
        let queue_infos = [vk::DeviceQueueCreateInfo::builder()
            .queue_family_index(graphics_family)
            .queue_priorities(&priorities)
            .build()];

        let enabled_features = features.to_vk();
        let layer_ptrs = registry.layer_name_ptrs();

        let create_info = vk::DeviceCreateInfo::builder()
            .queue_create_infos(&queue_infos)
            .enabled_features(&enabled_features)
            .enabled_layer_names(&layer_ptrs);

        let device = unsafe {
            instance
                .create_device(physical_device.handle(), &create_info, None)
                .map_err(ContextError::ContextCreationFailed)?
        };

        let graphics_queue = unsafe { device.get_device_queue(graphics_family, 0) };
        log::info!("logical device created (graphics queue family {})", graphics_family);

        Ok(Self {
            device,
            graphics_queue,
            graphics_family,
        })
    }

    /// Index of the queue family the graphics queue belongs to
    pub fn graphics_family(&self) -> u32 {
        self.graphics_family
    }
}

impl Drop for LogicalDevice {
    fn drop(&mut self) {
        unsafe {
            // Ensure device is idle before destruction
            let _ = self.device.device_wait_idle();
            self.device.destroy_device(None);
        }
        log::debug!("logical device destroyed");
    }
}
