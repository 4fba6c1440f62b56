use core::cell::Cell;

use crate::PlacementError;

/// Where the caller's buffer lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placement {
    /// Host memory. Never accepted by the kernels.
    Host,
    /// Accelerator with the given ordinal.
    Device(usize),
}

impl Placement {
    /// Returns the device ordinal, failing when the buffer is on the host.
    pub fn device_index(&self, argument: &'static str) -> Result<usize, PlacementError> {
        match self {
            Placement::Host => Err(PlacementError::NotOnDevice { argument }),
            Placement::Device(index) => Ok(*index),
        }
    }
}

/// Checks that every argument is device resident and that they all share one device.
///
/// The first argument is the reference the others are compared against.
pub(crate) fn common_device(
    arguments: &[(&'static str, Placement)],
) -> Result<usize, PlacementError> {
    let mut reference: Option<(&'static str, usize)> = None;

    for (argument, placement) in arguments {
        let index = placement.device_index(argument)?;

        match reference {
            None => reference = Some((argument, index)),
            Some((name, expected)) if expected != index => {
                return Err(PlacementError::DeviceMismatch {
                    argument,
                    reference: name,
                    expected,
                    found: index,
                });
            }
            Some(_) => {}
        }
    }

    reference
        .map(|(_, index)| index)
        .ok_or(PlacementError::NotOnDevice { argument: "matrix" })
}

std::thread_local! {
    static CURRENT_DEVICE: Cell<Option<usize>> = const { Cell::new(None) };
}

/// Device the calling thread currently targets, if any was selected.
pub fn current_device() -> Option<usize> {
    CURRENT_DEVICE.with(|current| current.get())
}

/// Pins the calling thread to a device until dropped.
///
/// This only scopes the device index tracked by this crate, see [current_device]. Kernels run
/// on the device of the client they are launched with, and [Placement] is what the caller
/// declares, it is never checked against that client. The previously selected device is
/// restored on drop, whichever way the scope is left.
#[must_use = "the device is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct DeviceGuard {
    previous: Option<usize>,
    device: usize,
}

impl DeviceGuard {
    pub fn new(device: usize) -> Self {
        let previous = CURRENT_DEVICE.with(|current| current.replace(Some(device)));
        if previous != Some(device) {
            log::trace!("Switching current device from {previous:?} to {device}");
        }

        Self { previous, device }
    }

    /// Device pinned by this guard.
    pub fn device(&self) -> usize {
        self.device
    }
}

impl Drop for DeviceGuard {
    fn drop(&mut self) {
        CURRENT_DEVICE.with(|current| current.set(self.previous));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_restores_previous_device() {
        assert_eq!(current_device(), None);
        {
            let outer = DeviceGuard::new(0);
            assert_eq!(current_device(), Some(0));
            {
                let inner = DeviceGuard::new(3);
                assert_eq!(inner.device(), 3);
                assert_eq!(current_device(), Some(3));
            }
            assert_eq!(current_device(), Some(outer.device()));
        }
        assert_eq!(current_device(), None);
    }

    #[test]
    fn guard_restores_on_early_return() {
        fn failing() -> Result<(), PlacementError> {
            let _guard = DeviceGuard::new(5);
            Placement::Host.device_index("matrix")?;
            Ok(())
        }

        assert!(failing().is_err());
        assert_eq!(current_device(), None);
    }

    #[test]
    fn host_arguments_are_rejected() {
        let err = common_device(&[("matrix", Placement::Device(0)), ("vector", Placement::Host)]);

        assert_eq!(err, Err(PlacementError::NotOnDevice { argument: "vector" }));
    }

    #[test]
    fn arguments_must_share_a_device() {
        let err = common_device(&[("input", Placement::Device(1)), ("output", Placement::Device(2))]);

        assert_eq!(
            err,
            Err(PlacementError::DeviceMismatch {
                argument: "output",
                reference: "input",
                expected: 1,
                found: 2,
            })
        );
    }

    #[test]
    fn common_device_is_returned() {
        let device = common_device(&[("input", Placement::Device(1)), ("output", Placement::Device(1))]);

        assert_eq!(device, Ok(1));
    }
}
