//! Diagnostic channel
//!
//! Optional validation/logging bridge installed atop the instance. Backend
//! messages arrive on a C callback, get converted, and are forwarded to a
//! [`DiagnosticSink`] chosen by the host application. The callback runs
//! synchronously on whatever thread triggered the message, so sinks must
//! stay lock-free and side-effect-light.

use std::ffi::{c_void, CStr};

use ash::extensions::ext::DebugUtils;
use ash::vk;
use serde::{Deserialize, Serialize};

use crate::context::{ContextError, ContextResult};

/// Message severity as presented to a sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Informational and verbose traffic
    Verbose,
    /// Likely bug, not fatal
    Warning,
    /// Specification violation or failure
    Error,
}

impl From<vk::DebugUtilsMessageSeverityFlagsEXT> for Severity {
    fn from(flags: vk::DebugUtilsMessageSeverityFlagsEXT) -> Self {
        if flags.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
            Self::Error
        } else if flags.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
            Self::Warning
        } else {
            Self::Verbose
        }
    }
}

/// Message category as presented to a sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    /// Miscellaneous backend traffic
    General,
    /// Correctness findings from the validation layer
    Validation,
    /// Potential performance problems
    Performance,
}

impl From<vk::DebugUtilsMessageTypeFlagsEXT> for Category {
    fn from(flags: vk::DebugUtilsMessageTypeFlagsEXT) -> Self {
        if flags.contains(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION) {
            Self::Validation
        } else if flags.contains(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE) {
            Self::Performance
        } else {
            Self::General
        }
    }
}

/// Which severities and categories reach the sink
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticsConfig {
    /// Report verbose-level messages
    pub report_verbose: bool,
    /// Report warnings
    pub report_warning: bool,
    /// Report errors
    pub report_error: bool,
    /// Include general backend messages
    pub general: bool,
    /// Include validation-correctness messages
    pub validation: bool,
    /// Include performance messages
    pub performance: bool,
}

impl DiagnosticsConfig {
    /// Severity filter as backend flags
    pub fn severity_flags(&self) -> vk::DebugUtilsMessageSeverityFlagsEXT {
        let mut flags = vk::DebugUtilsMessageSeverityFlagsEXT::empty();
        if self.report_verbose {
            flags |= vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE;
        }
        if self.report_warning {
            flags |= vk::DebugUtilsMessageSeverityFlagsEXT::WARNING;
        }
        if self.report_error {
            flags |= vk::DebugUtilsMessageSeverityFlagsEXT::ERROR;
        }
        flags
    }

    /// Category filter as backend flags
    pub fn type_flags(&self) -> vk::DebugUtilsMessageTypeFlagsEXT {
        let mut flags = vk::DebugUtilsMessageTypeFlagsEXT::empty();
        if self.general {
            flags |= vk::DebugUtilsMessageTypeFlagsEXT::GENERAL;
        }
        if self.validation {
            flags |= vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION;
        }
        if self.performance {
            flags |= vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE;
        }
        flags
    }

    /// Report only warnings and errors
    pub fn warnings_and_errors() -> Self {
        Self {
            report_verbose: false,
            ..Self::default()
        }
    }
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            report_verbose: true,
            report_warning: true,
            report_error: true,
            general: true,
            validation: true,
            performance: true,
        }
    }
}

/// Capability interface the host implements to receive backend messages.
///
/// The return value is the suppress signal handed back to the backend;
/// suppression is reserved for backend-internal use, so implementations
/// should return `false`.
pub trait DiagnosticSink: Send + Sync {
    /// Handle one diagnostic message. Runs reentrantly on the thread that
    /// triggered it; must not block.
    fn report(&self, severity: Severity, category: Category, message: &str) -> bool;
}

/// Default sink: routes messages into the `log` crate
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn report(&self, severity: Severity, category: Category, message: &str) -> bool {
        match severity {
            Severity::Error => log::error!("[Vulkan] {:?} - {}", category, message),
            Severity::Warning => log::warn!("[Vulkan] {:?} - {}", category, message),
            Severity::Verbose => log::debug!("[Vulkan] {:?} - {}", category, message),
        }
        false
    }
}

/// Keeps the boxed sink at a stable address for the backend's user-data
/// pointer.
pub(crate) struct SinkHolder {
    pub(crate) sink: Box<dyn DiagnosticSink>,
}

/// Messenger create info wired to the trampoline and `holder`.
///
/// Also chained into instance creation so that messages emitted during the
/// create call itself reach the sink. `holder` must outlive any use of the
/// returned struct by the backend.
pub(crate) fn messenger_create_info(
    config: &DiagnosticsConfig,
    holder: &SinkHolder,
) -> vk::DebugUtilsMessengerCreateInfoEXT {
    vk::DebugUtilsMessengerCreateInfoEXT::builder()
        .message_severity(config.severity_flags())
        .message_type(config.type_flags())
        .pfn_user_callback(Some(diagnostic_callback))
        .user_data(holder as *const SinkHolder as *mut c_void)
        .build()
}

unsafe extern "system" fn diagnostic_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    user_data: *mut c_void,
) -> vk::Bool32 {
    if callback_data.is_null() || user_data.is_null() {
        return vk::FALSE;
    }

    let holder = &*user_data.cast::<SinkHolder>();
    let message = if (*callback_data).p_message.is_null() {
        String::new()
    } else {
        CStr::from_ptr((*callback_data).p_message)
            .to_string_lossy()
            .into_owned()
    };

    let suppress = holder
        .sink
        .report(message_severity.into(), message_type.into(), &message);

    if suppress {
        vk::TRUE
    } else {
        vk::FALSE
    }
}

struct InstalledMessenger {
    debug_utils: DebugUtils,
    handle: vk::DebugUtilsMessengerEXT,
    /// Keeps the sink allocation alive for as long as the backend may call it
    _holder: Box<SinkHolder>,
}

/// Installed (or deliberately absent) diagnostic channel.
///
/// Uninstall is idempotent: a channel that was never installed, or was
/// already uninstalled, tears down as a no-op.
pub struct DebugMessenger {
    inner: Option<InstalledMessenger>,
}

impl DebugMessenger {
    /// Channel for a context running without diagnostics
    pub fn disabled() -> Self {
        Self { inner: None }
    }

    /// Install the standing messenger on a created instance.
    ///
    /// Probes for the create entry point first, mirroring the loader
    /// contract: a missing function pointer is [`ContextError::UnsupportedDiagnostics`],
    /// a rejected create call is [`ContextError::DiagnosticsRejected`].
    pub(crate) fn install(
        entry: &ash::Entry,
        instance: &ash::Instance,
        config: &DiagnosticsConfig,
        holder: Box<SinkHolder>,
    ) -> ContextResult<Self> {
        let create_name =
            CStr::from_bytes_with_nul(b"vkCreateDebugUtilsMessengerEXT\0").unwrap();
        let create_fn = unsafe {
            (entry.static_fn().get_instance_proc_addr)(instance.handle(), create_name.as_ptr())
        };
        if create_fn.is_none() {
            return Err(ContextError::UnsupportedDiagnostics);
        }

        let debug_utils = DebugUtils::new(entry, instance);
        let create_info = messenger_create_info(config, &holder);
        let handle = unsafe { debug_utils.create_debug_utils_messenger(&create_info, None) }
            .map_err(ContextError::DiagnosticsRejected)?;

        log::debug!("debug messenger installed");
        Ok(Self {
            inner: Some(InstalledMessenger {
                debug_utils,
                handle,
                _holder: holder,
            }),
        })
    }

    /// Destroy the messenger if one is installed. Safe to call any number
    /// of times; must happen before the owning instance is destroyed.
    pub fn uninstall(&mut self) {
        if let Some(messenger) = self.inner.take() {
            unsafe {
                messenger
                    .debug_utils
                    .destroy_debug_utils_messenger(messenger.handle, None);
            }
            log::debug!("debug messenger uninstalled");
        }
    }

    /// Whether a messenger is currently installed
    pub fn is_installed(&self) -> bool {
        self.inner.is_some()
    }
}

impl Drop for DebugMessenger {
    fn drop(&mut self) {
        self.uninstall();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uninstall_without_install_is_noop() {
        let mut messenger = DebugMessenger::disabled();
        assert!(!messenger.is_installed());

        messenger.uninstall();
        messenger.uninstall();
        assert!(!messenger.is_installed());
    }

    #[test]
    fn test_severity_mapping() {
        assert_eq!(
            Severity::from(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR),
            Severity::Error
        );
        assert_eq!(
            Severity::from(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING),
            Severity::Warning
        );
        assert_eq!(
            Severity::from(vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE),
            Severity::Verbose
        );
        assert_eq!(
            Severity::from(vk::DebugUtilsMessageSeverityFlagsEXT::INFO),
            Severity::Verbose
        );
    }

    #[test]
    fn test_category_mapping() {
        assert_eq!(
            Category::from(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION),
            Category::Validation
        );
        assert_eq!(
            Category::from(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE),
            Category::Performance
        );
        assert_eq!(
            Category::from(vk::DebugUtilsMessageTypeFlagsEXT::GENERAL),
            Category::General
        );
    }

    #[test]
    fn test_default_config_enables_everything() {
        let config = DiagnosticsConfig::default();
        assert_eq!(
            config.severity_flags(),
            vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
        );
        assert_eq!(
            config.type_flags(),
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE
        );
    }

    #[test]
    fn test_warnings_and_errors_preset() {
        let config = DiagnosticsConfig::warnings_and_errors();
        let flags = config.severity_flags();
        assert!(!flags.contains(vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE));
        assert!(flags.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING));
        assert!(flags.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR));
    }

    #[test]
    fn test_log_sink_never_suppresses() {
        let sink = LogSink;
        assert!(!sink.report(Severity::Error, Category::Validation, "boom"));
        assert!(!sink.report(Severity::Verbose, Category::General, "fine"));
    }
}
