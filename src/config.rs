//! Compositor configuration.

use std::time::Duration;

/// Cursor image shown without any client or compositor override.
pub const DEFAULT_CURSOR: &str = "left_ptr";

/// Frame interval for outputs without a known refresh rate.
pub const FALLBACK_FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Number of virtual terminals reachable through the `XF86Switch_VT_*` keys.
pub const VT_COUNT: u32 = 12;
