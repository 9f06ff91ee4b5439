//! Physical device enumeration and selection
//!
//! Devices are captured as immutable snapshots so the requirement
//! predicates and the queue-family scan run on plain data. Selection is
//! strict first-match in backend enumeration order; the order is
//! platform-dependent and deliberately not reordered or scored.

use std::ffi::CStr;

use ash::{vk, Instance};
use serde::{Deserialize, Serialize};

use crate::context::{ContextError, ContextResult};

/// Broad device classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceClass {
    /// Dedicated GPU
    Discrete,
    /// GPU sharing memory with the host
    Integrated,
    /// Virtual, CPU, or unrecognized device types
    Other,
}

impl From<vk::PhysicalDeviceType> for DeviceClass {
    fn from(device_type: vk::PhysicalDeviceType) -> Self {
        match device_type {
            vk::PhysicalDeviceType::DISCRETE_GPU => Self::Discrete,
            vk::PhysicalDeviceType::INTEGRATED_GPU => Self::Integrated,
            _ => Self::Other,
        }
    }
}

/// Feature flags the bootstrap understands, both as "supported by the
/// device" snapshots and as "required by the application" sets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceFeatures {
    /// Geometry shader stage support
    pub geometry_shader: bool,
    /// Anisotropic sampler filtering support
    pub sampler_anisotropy: bool,
}

impl DeviceFeatures {
    pub(crate) fn from_vk(features: &vk::PhysicalDeviceFeatures) -> Self {
        Self {
            geometry_shader: features.geometry_shader == vk::TRUE,
            sampler_anisotropy: features.sampler_anisotropy == vk::TRUE,
        }
    }

    pub(crate) fn to_vk(self) -> vk::PhysicalDeviceFeatures {
        vk::PhysicalDeviceFeatures::builder()
            .geometry_shader(self.geometry_shader)
            .sampler_anisotropy(self.sampler_anisotropy)
            .build()
    }

    /// Whether every flag set in `required` is also set here
    pub fn contains(&self, required: &Self) -> bool {
        (!required.geometry_shader || self.geometry_shader)
            && (!required.sampler_anisotropy || self.sampler_anisotropy)
    }
}

/// One queue family's capability snapshot
#[derive(Debug, Clone, Copy)]
pub struct QueueFamilyInfo {
    /// Capability flags of every queue in the family
    pub flags: vk::QueueFlags,
    /// Number of queues the family exposes
    pub queue_count: u32,
}

/// Result of matching required queue capabilities against a device's
/// family list. Complete iff a graphics-capable index was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFamilySelection {
    graphics: Option<u32>,
}

impl QueueFamilySelection {
    /// Index of the first graphics-capable family, if any
    pub fn graphics_index(&self) -> Option<u32> {
        self.graphics
    }

    /// Whether every required capability found a family
    pub fn is_complete(&self) -> bool {
        self.graphics.is_some()
    }
}

/// Read-only snapshot of one enumerated physical device.
///
/// Valid only for the lifetime of the instance it was enumerated from;
/// the `handle` is borrowed from backend-owned data, never destroyed here.
#[derive(Debug, Clone)]
pub struct PhysicalDeviceInfo {
    handle: vk::PhysicalDevice,
    name: String,
    class: DeviceClass,
    features: DeviceFeatures,
    queue_families: Vec<QueueFamilyInfo>,
}

impl PhysicalDeviceInfo {
    /// Build a snapshot from explicit parts. Useful for host-side test
    /// fixtures; real snapshots come out of [`enumerate_devices`].
    pub fn new(
        handle: vk::PhysicalDevice,
        name: String,
        class: DeviceClass,
        features: DeviceFeatures,
        queue_families: Vec<QueueFamilyInfo>,
    ) -> Self {
        Self {
            handle,
            name,
            class,
            features,
            queue_families,
        }
    }

    fn query(instance: &Instance, handle: vk::PhysicalDevice) -> Self {
        let properties = unsafe { instance.get_physical_device_properties(handle) };
        let features = unsafe { instance.get_physical_device_features(handle) };
        let families = unsafe { instance.get_physical_device_queue_family_properties(handle) };

        let name = unsafe { CStr::from_ptr(properties.device_name.as_ptr()) }
            .to_string_lossy()
            .into_owned();

        Self {
            handle,
            name,
            class: properties.device_type.into(),
            features: DeviceFeatures::from_vk(&features),
            queue_families: families
                .iter()
                .map(|family| QueueFamilyInfo {
                    flags: family.queue_flags,
                    queue_count: family.queue_count,
                })
                .collect(),
        }
    }

    /// Backend handle for device creation
    pub fn handle(&self) -> vk::PhysicalDevice {
        self.handle
    }

    /// Device name as reported by the driver
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Device classification
    pub fn class(&self) -> DeviceClass {
        self.class
    }

    /// Supported feature flags
    pub fn features(&self) -> DeviceFeatures {
        self.features
    }

    /// Queue family capability snapshots, in family-index order
    pub fn queue_families(&self) -> &[QueueFamilyInfo] {
        &self.queue_families
    }

    /// Scan the family list in index order for graphics support.
    ///
    /// Stops at the first graphics-capable index; when several families
    /// qualify, only the lowest index is ever retained.
    pub fn find_graphics_family(&self) -> QueueFamilySelection {
        let graphics = self
            .queue_families
            .iter()
            .position(|family| family.flags.contains(vk::QueueFlags::GRAPHICS))
            .map(|index| index as u32);

        QueueFamilySelection { graphics }
    }
}

/// Predicates a device must pass to be selected
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceRequirements {
    /// Required device class, matched exactly; `None` accepts any class
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<DeviceClass>,
    /// Feature flags the device must support
    pub features: DeviceFeatures,
}

impl DeviceRequirements {
    /// Whether `device` passes every predicate, including queue-family
    /// completeness.
    pub fn satisfied_by(&self, device: &PhysicalDeviceInfo) -> bool {
        self.class.map_or(true, |class| device.class() == class)
            && device.features().contains(&self.features)
            && device.find_graphics_family().is_complete()
    }
}

impl Default for DeviceRequirements {
    fn default() -> Self {
        Self {
            class: Some(DeviceClass::Discrete),
            features: DeviceFeatures {
                geometry_shader: true,
                sampler_anisotropy: false,
            },
        }
    }
}

/// Enumerate every physical device the instance can see.
///
/// Fails with [`ContextError::NoDevicesFound`] when the backend reports
/// none.
pub fn enumerate_devices(instance: &Instance) -> ContextResult<Vec<PhysicalDeviceInfo>> {
    let handles =
        unsafe { instance.enumerate_physical_devices() }.map_err(ContextError::Api)?;

    if handles.is_empty() {
        return Err(ContextError::NoDevicesFound);
    }

    let devices: Vec<PhysicalDeviceInfo> = handles
        .iter()
        .map(|&handle| PhysicalDeviceInfo::query(instance, handle))
        .collect();

    for device in &devices {
        log::debug!(
            "device found: {} ({:?}, {} queue families)",
            device.name(),
            device.class(),
            device.queue_families().len()
        );
    }

    Ok(devices)
}

/// Pick the first device in enumeration order that passes all requirement
/// predicates. No scoring, no reordering.
pub fn select_first_suitable<'a>(
    devices: &'a [PhysicalDeviceInfo],
    requirements: &DeviceRequirements,
) -> ContextResult<&'a PhysicalDeviceInfo> {
    if devices.is_empty() {
        return Err(ContextError::NoDevicesFound);
    }

    let selected = devices
        .iter()
        .find(|device| requirements.satisfied_by(device))
        .ok_or(ContextError::NoSuitableDevice)?;

    log::info!("Selected GPU: {}", selected.name());
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_device(
        name: &str,
        class: DeviceClass,
        features: DeviceFeatures,
        family_flags: &[vk::QueueFlags],
    ) -> PhysicalDeviceInfo {
        PhysicalDeviceInfo::new(
            vk::PhysicalDevice::null(),
            name.to_string(),
            class,
            features,
            family_flags
                .iter()
                .map(|&flags| QueueFamilyInfo {
                    flags,
                    queue_count: 1,
                })
                .collect(),
        )
    }

    fn gfx_features() -> DeviceFeatures {
        DeviceFeatures {
            geometry_shader: true,
            sampler_anisotropy: false,
        }
    }

    #[test]
    fn test_empty_device_list_fails_before_predicates() {
        let result = select_first_suitable(&[], &DeviceRequirements::default());
        assert!(matches!(result, Err(ContextError::NoDevicesFound)));
    }

    #[test]
    fn test_no_graphics_capable_device_is_unsuitable() {
        let devices = vec![
            test_device("compute-only", DeviceClass::Discrete, gfx_features(), &[
                vk::QueueFlags::COMPUTE,
            ]),
            test_device("transfer-only", DeviceClass::Discrete, gfx_features(), &[
                vk::QueueFlags::TRANSFER,
            ]),
        ];

        let result = select_first_suitable(&devices, &DeviceRequirements::default());
        assert!(matches!(result, Err(ContextError::NoSuitableDevice)));
    }

    #[test]
    fn test_first_match_wins_in_enumeration_order() {
        // B is the first passing candidate even though C has a graphics
        // family at a lower index.
        let a = test_device("integrated-no-gfx", DeviceClass::Integrated, gfx_features(), &[
            vk::QueueFlags::COMPUTE,
        ]);
        let b = test_device("discrete-gfx-at-2", DeviceClass::Discrete, gfx_features(), &[
            vk::QueueFlags::COMPUTE,
            vk::QueueFlags::TRANSFER,
            vk::QueueFlags::GRAPHICS,
        ]);
        let c = test_device("discrete-gfx-at-0", DeviceClass::Discrete, gfx_features(), &[
            vk::QueueFlags::GRAPHICS,
        ]);

        let devices = vec![a, b, c];
        let selected = select_first_suitable(&devices, &DeviceRequirements::default()).unwrap();

        assert_eq!(selected.name(), "discrete-gfx-at-2");
        assert_eq!(selected.find_graphics_family().graphics_index(), Some(2));
    }

    #[test]
    fn test_queue_scan_retains_lowest_graphics_index() {
        let device = test_device("mixed-families", DeviceClass::Discrete, gfx_features(), &[
            vk::QueueFlags::COMPUTE,
            vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE,
            vk::QueueFlags::GRAPHICS,
        ]);

        assert_eq!(device.find_graphics_family().graphics_index(), Some(1));
    }

    #[test]
    fn test_selection_incomplete_without_graphics_family() {
        let device = test_device("compute-only", DeviceClass::Discrete, gfx_features(), &[
            vk::QueueFlags::COMPUTE,
        ]);

        let selection = device.find_graphics_family();
        assert!(!selection.is_complete());
        assert_eq!(selection.graphics_index(), None);
    }

    #[test]
    fn test_missing_required_feature_rejects_device() {
        let device = test_device(
            "no-geometry",
            DeviceClass::Discrete,
            DeviceFeatures::default(),
            &[vk::QueueFlags::GRAPHICS],
        );

        assert!(!DeviceRequirements::default().satisfied_by(&device));
    }

    #[test]
    fn test_class_requirement_none_accepts_any_class() {
        let requirements = DeviceRequirements {
            class: None,
            features: DeviceFeatures::default(),
        };
        let device = test_device(
            "integrated",
            DeviceClass::Integrated,
            DeviceFeatures::default(),
            &[vk::QueueFlags::GRAPHICS],
        );

        assert!(requirements.satisfied_by(&device));
    }

    #[test]
    fn test_device_class_mapping() {
        assert_eq!(
            DeviceClass::from(vk::PhysicalDeviceType::DISCRETE_GPU),
            DeviceClass::Discrete
        );
        assert_eq!(
            DeviceClass::from(vk::PhysicalDeviceType::INTEGRATED_GPU),
            DeviceClass::Integrated
        );
        assert_eq!(DeviceClass::from(vk::PhysicalDeviceType::CPU), DeviceClass::Other);
        assert_eq!(
            DeviceClass::from(vk::PhysicalDeviceType::VIRTUAL_GPU),
            DeviceClass::Other
        );
    }

    #[test]
    fn test_feature_containment() {
        let supported = DeviceFeatures {
            geometry_shader: true,
            sampler_anisotropy: true,
        };
        let required = DeviceFeatures {
            geometry_shader: true,
            sampler_anisotropy: false,
        };

        assert!(supported.contains(&required));
        assert!(!required.contains(&supported));
        assert!(supported.contains(&DeviceFeatures::default()));
    }
}
