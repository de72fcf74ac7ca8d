// Notification surfaces: the desktop service where the OS has one, an
// in-process recorder everywhere else.

pub mod headless;
#[cfg(target_os = "linux")]
pub mod linux;

use std::sync::Arc;

pub use headless::HeadlessSurface;
#[cfg(target_os = "linux")]
pub use linux::LinuxSurface;

use crate::components::platform::NotificationSurface;

/// Factory for the notification surface of the current OS
pub struct SurfaceFactory;

impl SurfaceFactory {
    /// Native surface when this OS has one, headless otherwise
    pub fn create_surface(app_name: &str) -> Arc<dyn NotificationSurface> {
        #[cfg(target_os = "linux")]
        {
            Arc::new(LinuxSurface::new(app_name))
        }

        #[cfg(not(target_os = "linux"))]
        {
            tracing::debug!(app_name, "no native notification surface, using headless");
            Arc::new(HeadlessSurface::new())
        }
    }

    pub fn headless() -> Arc<HeadlessSurface> {
        Arc::new(HeadlessSurface::new())
    }

    /// Whether `create_surface` returns a native surface on this OS
    pub fn has_native_surface() -> bool {
        cfg!(target_os = "linux")
    }
}
