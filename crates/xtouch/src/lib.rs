//! xtouch: XInput2 multi-touch bridge
//!
//! Opens a display session with touch events selected on one input device
//! and forwards every touch begin/update/end as a flat [`TouchSample`] to a
//! host-provided handler.
//!
//! ```no_run
//! use xtouch::{Config, Dispatch, TouchPump, TouchSample};
//!
//! let config = Config::load();
//! let session = xtouch::initialize(&config)?;
//! let mut pump = TouchPump::with_handler(session, |sample: &TouchSample| {
//!     println!("{sample:?}");
//!     Dispatch::Continue
//! });
//!
//! loop {
//!     if pump.poll()?.stopped_by_key() {
//!         break;
//!     }
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod backend;
pub mod config;
pub mod device;
pub mod error;
pub mod pump;
pub mod sample;
pub mod session;

pub use config::Config;
pub use device::{DeviceClassKind, DeviceInfo, DevicePolicy, DeviceTarget};
pub use error::{BackendError, InitError, PumpError};
pub use pump::{Dispatch, PassEnd, PollSummary, TouchHandler, TouchPump};
pub use sample::{TouchPhase, TouchSample};
pub use session::{DeviceHandle, DeviceListing, Session};

#[cfg(feature = "x11-backend")]
pub use backend::x11::X11Backend;

/// Connect to the configured X display and set up touch event selection
#[cfg(feature = "x11-backend")]
pub fn initialize(config: &Config) -> Result<Session<X11Backend>, InitError> {
    Session::initialize(config)
}
