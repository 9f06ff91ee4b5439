//! Capability registry
//!
//! The immutable set of layer and extension names the bootstrap requires:
//! platform-provided surface extensions plus, when diagnostics are on, the
//! validation layer and the debug utils extension. Computed once per
//! context and treated as read-only from then on.

use std::ffi::{c_char, CStr, CString};

use ash::extensions::ext::DebugUtils;
use ash::vk;

/// Name of the Khronos validation layer required when diagnostics are enabled
pub const VALIDATION_LAYER_NAME: &str = "VK_LAYER_KHRONOS_validation";

/// Immutable set of required layer and extension names
pub struct CapabilityRegistry {
    required_layers: Vec<CString>,
    required_extensions: Vec<CString>,
}

impl CapabilityRegistry {
    /// Compute the registry from the platform extension list and the
    /// diagnostics toggle.
    pub fn new(platform_extensions: &[String], diagnostics_enabled: bool) -> Self {
        let required_layers = if diagnostics_enabled {
            vec![CString::new(VALIDATION_LAYER_NAME).unwrap()]
        } else {
            Vec::new()
        };

        let mut required_extensions: Vec<CString> = platform_extensions
            .iter()
            .map(|ext| CString::new(ext.as_str()).unwrap())
            .collect();

        if diagnostics_enabled {
            required_extensions.push(DebugUtils::name().to_owned());
        }

        Self {
            required_layers,
            required_extensions,
        }
    }

    /// Required layer names (empty when diagnostics are disabled)
    pub fn required_layers(&self) -> &[CString] {
        &self.required_layers
    }

    /// Required extension names
    pub fn required_extensions(&self) -> &[CString] {
        &self.required_extensions
    }

    /// Raw pointer view of the layer names for FFI create calls
    pub fn layer_name_ptrs(&self) -> Vec<*const c_char> {
        self.required_layers.iter().map(|name| name.as_ptr()).collect()
    }

    /// Raw pointer view of the extension names for FFI create calls
    pub fn extension_name_ptrs(&self) -> Vec<*const c_char> {
        self.required_extensions.iter().map(|name| name.as_ptr()).collect()
    }
}

/// First required layer not present in `available`, by exact byte-for-byte
/// match. Case matters; prefixes do not count.
pub(crate) fn find_missing_layer<'a>(
    required: &'a [CString],
    available: &[CString],
) -> Option<&'a CStr> {
    required
        .iter()
        .map(CString::as_c_str)
        .find(|required_name| {
            !available
                .iter()
                .any(|available_name| available_name.as_c_str() == *required_name)
        })
}

/// Owned layer names out of the backend's property structs
pub(crate) fn layer_properties_names(properties: &[vk::LayerProperties]) -> Vec<CString> {
    properties
        .iter()
        .map(|props| unsafe { CStr::from_ptr(props.layer_name.as_ptr()) }.to_owned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cstrings(names: &[&str]) -> Vec<CString> {
        names.iter().map(|name| CString::new(*name).unwrap()).collect()
    }

    #[test]
    fn test_registry_without_diagnostics() {
        let platform = vec!["VK_KHR_surface".to_string(), "VK_KHR_xcb_surface".to_string()];
        let registry = CapabilityRegistry::new(&platform, false);

        assert!(registry.required_layers().is_empty());
        assert_eq!(registry.required_extensions(), cstrings(&["VK_KHR_surface", "VK_KHR_xcb_surface"]).as_slice());
    }

    #[test]
    fn test_registry_with_diagnostics_adds_layer_and_extension() {
        let platform = vec!["VK_KHR_surface".to_string()];
        let registry = CapabilityRegistry::new(&platform, true);

        assert_eq!(registry.required_layers(), cstrings(&[VALIDATION_LAYER_NAME]).as_slice());
        assert_eq!(
            registry.required_extensions().last().map(CString::as_c_str),
            Some(DebugUtils::name())
        );
    }

    #[test]
    fn test_exact_layer_match() {
        let required = cstrings(&[VALIDATION_LAYER_NAME]);
        let available = cstrings(&["VK_LAYER_MESA_overlay", VALIDATION_LAYER_NAME]);
        assert!(find_missing_layer(&required, &available).is_none());
    }

    #[test]
    fn test_prefix_is_not_a_match() {
        let required = cstrings(&[VALIDATION_LAYER_NAME]);
        let available = cstrings(&["VK_LAYER_KHRONOS"]);
        let missing = find_missing_layer(&required, &available).unwrap();
        assert_eq!(missing.to_str().unwrap(), VALIDATION_LAYER_NAME);
    }

    #[test]
    fn test_layer_match_is_case_sensitive() {
        let required = cstrings(&[VALIDATION_LAYER_NAME]);
        let available = cstrings(&["vk_layer_khronos_validation"]);
        assert!(find_missing_layer(&required, &available).is_some());
    }

    #[test]
    fn test_no_required_layers_never_misses() {
        assert!(find_missing_layer(&[], &[]).is_none());
    }
}
