// SPDX-License-Identifier: GPL-3.0-only

//! Preview and picture size selection

use crate::backends::camera::Size;
use crate::constants::ASPECT_TOLERANCE;

/// Select the supported size closest to the requested one
///
/// The request is normalised to landscape, then:
/// 1. among sizes whose height/width ratio is within [`ASPECT_TOLERANCE`] of
///    the requested ratio, the one with the closest height wins;
/// 2. if no size has a matching aspect, the closest height wins regardless
///    of ratio.
///
/// Ties keep the earliest size in `sizes`. Returns `None` only for an empty
/// list.
pub fn select_optimal_size(sizes: &[Size], width: u32, height: u32) -> Option<Size> {
    let (width, height) = if height > width {
        (height, width)
    } else {
        (width, height)
    };
    let target_ratio = height as f64 / width as f64;

    let height_diff = |size: &Size| size.height.abs_diff(height);

    closest(
        sizes
            .iter()
            .filter(|size| (size.portrait_ratio() - target_ratio).abs() <= ASPECT_TOLERANCE),
        height_diff,
    )
    .or_else(|| closest(sizes.iter(), height_diff))
}

// min_by_key keeps the last minimum, this keeps the first
fn closest<'a>(sizes: impl Iterator<Item = &'a Size>, key: impl Fn(&Size) -> u32) -> Option<Size> {
    let mut best: Option<(Size, u32)> = None;
    for size in sizes {
        let diff = key(size);
        if best.is_none_or(|(_, best_diff)| diff < best_diff) {
            best = Some((*size, diff));
        }
    }
    best.map(|(size, _)| size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefers_matching_aspect() {
        let sizes = [Size::new(640, 480), Size::new(1280, 720)];
        assert_eq!(
            select_optimal_size(&sizes, 1000, 560),
            Some(Size::new(1280, 720))
        );
    }

    #[test]
    fn test_matching_aspect_beats_closer_height() {
        // 800x600 is closer in height but 4:3 is outside the tolerance of 16:9
        let sizes = [Size::new(800, 600), Size::new(1920, 1080)];
        assert_eq!(
            select_optimal_size(&sizes, 1280, 720),
            Some(Size::new(1920, 1080))
        );
    }

    #[test]
    fn test_portrait_request_is_normalised() {
        let sizes = [Size::new(640, 480), Size::new(1280, 720)];
        assert_eq!(
            select_optimal_size(&sizes, 560, 1000),
            Some(Size::new(1280, 720))
        );
    }

    #[test]
    fn test_falls_back_to_closest_height() {
        // Square request, no size within tolerance of 1.0
        let sizes = [Size::new(1920, 1080), Size::new(1280, 720), Size::new(640, 360)];
        assert_eq!(
            select_optimal_size(&sizes, 700, 700),
            Some(Size::new(1280, 720))
        );
    }

    #[test]
    fn test_tie_keeps_first_candidate() {
        let sizes = [Size::new(1280, 720), Size::new(1200, 720)];
        assert_eq!(
            select_optimal_size(&sizes, 1280, 720),
            Some(Size::new(1280, 720))
        );
    }

    #[test]
    fn test_empty_list() {
        assert_eq!(select_optimal_size(&[], 1280, 720), None);
    }
}
