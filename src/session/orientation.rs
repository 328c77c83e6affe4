// SPDX-License-Identifier: GPL-3.0-only

//! Preview orientation from sensor mounting and display rotation

use crate::backends::camera::{Facing, Rotation};

/// Clockwise rotation to apply to preview frames
///
/// Front cameras are mirrored, so their rotation is taken the other way round.
pub fn display_orientation(facing: Facing, mount_orientation: u32, rotation: Rotation) -> u32 {
    let mount = mount_orientation % 360;
    let degrees = rotation.degrees();
    match facing {
        Facing::Front => (360 - (mount + degrees) % 360) % 360,
        Facing::Back => (mount + 360 - degrees) % 360,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROTATIONS: [Rotation; 4] = [
        Rotation::Rotate0,
        Rotation::Rotate90,
        Rotation::Rotate180,
        Rotation::Rotate270,
    ];

    #[test]
    fn test_back_camera() {
        assert_eq!(display_orientation(Facing::Back, 90, Rotation::Rotate270), 180);
        assert_eq!(display_orientation(Facing::Back, 90, Rotation::Rotate0), 90);
        assert_eq!(display_orientation(Facing::Back, 90, Rotation::Rotate90), 0);
    }

    #[test]
    fn test_front_camera_compensates_mirror() {
        assert_eq!(display_orientation(Facing::Front, 270, Rotation::Rotate0), 90);
        assert_eq!(display_orientation(Facing::Front, 270, Rotation::Rotate90), 0);
        assert_eq!(display_orientation(Facing::Front, 90, Rotation::Rotate0), 270);
    }

    #[test]
    fn test_result_always_in_range() {
        for facing in [Facing::Front, Facing::Back] {
            for mount in [0, 90, 180, 270] {
                for rotation in ROTATIONS {
                    let result = display_orientation(facing, mount, rotation);
                    assert!(result < 360, "{facing} {mount} {rotation} gave {result}");
                    assert_eq!(result % 90, 0);
                }
            }
        }
    }

    #[test]
    fn test_periodic_in_mount_orientation() {
        for rotation in ROTATIONS {
            assert_eq!(
                display_orientation(Facing::Back, 450, rotation),
                display_orientation(Facing::Back, 90, rotation)
            );
        }
    }
}
