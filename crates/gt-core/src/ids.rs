use core::fmt;
use core::num::NonZeroU32;

use crate::error::{CoreError, CoreResult};

/// Declares a compact, typed handle into an arena.
///
/// Handles store `index + 1` in a `NonZeroU32`, so `Option<Handle>` costs no
/// extra space. Distinct handle types cannot be mixed up at call sites.
macro_rules! handle {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub struct $name(NonZeroU32);

        impl $name {
            /// Create a handle from a 0-based arena index.
            pub fn from_index(index: u32) -> Self {
                Self(NonZeroU32::MIN.saturating_add(index))
            }

            /// Create a handle from an arena length, failing past `u32::MAX - 1`.
            pub fn try_from_usize(index: usize) -> CoreResult<Self> {
                u32::try_from(index)
                    .ok()
                    .filter(|&i| i < u32::MAX)
                    .map(Self::from_index)
                    .ok_or(CoreError::HandleOverflow { what: $label })
            }

            /// Recover the 0-based arena index.
            pub fn index(self) -> usize {
                (self.0.get() - 1) as usize
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", $label, self.index())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "#{}", self.index())
            }
        }
    };
}

handle!(
    /// Identity of a node: its position in the network's declaration order.
    NodeId,
    "NodeId"
);

handle!(
    /// Handle of a port in the network's port arena.
    PortId,
    "PortId"
);
