#![cfg_attr(not(test), no_std)]

// Export the logging macros for either defmt or log
#[macro_use]
mod logging;

pub mod calibration;
pub mod clock;
pub mod consts;
pub mod detection;
pub mod errors;
pub mod filters;
pub mod hw_abstraction;
pub mod signals;
pub mod sync;
pub mod tasks;
pub mod types;

// Re-exported for implementors
pub use embassy_futures;
pub use embassy_sync;
pub use embassy_time;
pub use heapless;

#[macro_export]
macro_rules! const_default {
    ($type:ty => { $($token:tt)+ } ) => {
        impl $crate::ConstDefault for $type {
            const DEFAULT: Self = Self::const_default();
        }

        impl $type {
            pub const fn const_default() -> Self {
                Self { $($token)+ }
            }
        }

        impl Default for $type {
            fn default() -> Self {
                Self::const_default()
            }
        }
    };
}

pub trait ConstDefault {
    const DEFAULT: Self;
}
