//! Computer-vision element discovery.
//!
//! For applications without an accessibility tree the focused window is
//! captured and segmented: the grayscale image is binarised with Otsu's
//! threshold, the minority class is taken as foreground (text and widget
//! outlines on a plain background), and the bounding box of every
//! 8-connected foreground component becomes one element.

use super::BackendError;
use crate::traits::{ElementBackend, WindowSystem};
use crate::types::{ActionableElement, Extents};
use image::imageops::{self, FilterType};
use image::{GrayImage, RgbaImage};
use log::debug;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use xcap::Monitor;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    /// Components narrower than this are dropped (pixels).
    pub min_width: u32,
    /// Components shorter than this are dropped (pixels).
    pub min_height: u32,
    /// Components covering more than this fraction of the window are
    /// dropped.
    pub max_area_ratio: f64,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            min_width: 4,
            min_height: 4,
            max_area_ratio: 0.25,
        }
    }
}

/// Captures a screen region.
pub trait ScreenCapture {
    fn capture(&self, region: Extents) -> Result<GrayImage, BackendError>;
}

/// Captures the monitor that holds the region with `xcap` and cuts the
/// region out of it.
#[derive(Debug, Default)]
pub struct MonitorCapture;

impl MonitorCapture {
    pub fn new() -> Self {
        Self
    }
}

impl ScreenCapture for MonitorCapture {
    fn capture(&self, region: Extents) -> Result<GrayImage, BackendError> {
        let monitors = Monitor::all().map_err(|e| BackendError::Capture(format!("list monitors: {}", e)))?;
        let holds = |m: &Monitor| {
            region.x >= m.x()
                && region.x < m.x() + m.width() as i32
                && region.y >= m.y()
                && region.y < m.y() + m.height() as i32
        };
        let monitor = match monitors.iter().position(holds) {
            Some(i) => &monitors[i],
            None => monitors
                .first()
                .ok_or_else(|| BackendError::Capture("no monitors".into()))?,
        };
        let layout = Extents::new(
            monitor.x(),
            monitor.y(),
            monitor.width() as i32,
            monitor.height() as i32,
        );
        debug!("capturing {} ({}) for {}", monitor.name(), layout, region);

        let screen = monitor
            .capture_image()
            .map_err(|e| BackendError::Capture(format!("capture {}: {}", monitor.name(), e)))?;
        Ok(crop_to_region(&screen, layout, region))
    }
}

/// Cut `region` (layout coordinates) out of a capture of the monitor laid
/// out at `monitor`, as a grayscale image in layout pixels.
///
/// HiDPI captures are larger than the monitor's layout size; the crop is
/// taken at capture scale and resized back.  The crop is clamped to the
/// capture.
pub fn crop_to_region(screen: &RgbaImage, monitor: Extents, region: Extents) -> GrayImage {
    let scale = if monitor.width > 0 {
        screen.width() as f64 / monitor.width as f64
    } else {
        1.0
    };
    let px = |v: i32| (v.max(0) as f64 * scale).round() as u32;
    let window = imageops::crop_imm(
        screen,
        px(region.x - monitor.x),
        px(region.y - monitor.y),
        px(region.width),
        px(region.height),
    )
    .to_image();
    let gray = imageops::grayscale(&window);
    if (scale - 1.0).abs() < f64::EPSILON {
        gray
    } else {
        let w = ((gray.width() as f64 / scale).round() as u32).max(1);
        let h = ((gray.height() as f64 / scale).round() as u32).max(1);
        imageops::resize(&gray, w, h, FilterType::Triangle)
    }
}

/// A component bounding box in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Otsu's threshold: the level maximising between-class variance.
/// Pixels `> level` form the bright class.
pub fn otsu_level(image: &GrayImage) -> u8 {
    let mut histogram = [0u64; 256];
    for p in image.pixels() {
        histogram[p.0[0] as usize] += 1;
    }
    let total: u64 = histogram.iter().sum();
    if total == 0 {
        return 0;
    }
    let sum_all: f64 = histogram
        .iter()
        .enumerate()
        .map(|(i, &c)| i as f64 * c as f64)
        .sum();

    let mut best = (0u8, -1.0f64);
    let mut weight_dark = 0u64;
    let mut sum_dark = 0.0f64;
    for (level, &count) in histogram.iter().enumerate() {
        weight_dark += count;
        if weight_dark == 0 {
            continue;
        }
        let weight_bright = total - weight_dark;
        if weight_bright == 0 {
            break;
        }
        sum_dark += level as f64 * count as f64;
        let mean_dark = sum_dark / weight_dark as f64;
        let mean_bright = (sum_all - sum_dark) / weight_bright as f64;
        let between = weight_dark as f64 * weight_bright as f64 * (mean_dark - mean_bright).powi(2);
        if between > best.1 {
            best = (level as u8, between);
        }
    }
    best.0
}

/// Foreground mask: the minority side of the Otsu split.
fn foreground_mask(image: &GrayImage) -> Vec<bool> {
    let level = otsu_level(image);
    let bright: Vec<bool> = image.pixels().map(|p| p.0[0] > level).collect();
    let bright_count = bright.iter().filter(|b| **b).count();
    if bright_count * 2 > bright.len() {
        bright.into_iter().map(|b| !b).collect()
    } else {
        bright
    }
}

/// Bounding boxes of the 8-connected foreground components, ordered by
/// their first pixel in raster order.
pub fn detect_regions(image: &GrayImage) -> Vec<Region> {
    let (w, h) = image.dimensions();
    let (w, h) = (w as usize, h as usize);
    let mut mask = foreground_mask(image);
    let mut regions = Vec::new();
    let mut stack = Vec::new();

    for start in 0..mask.len() {
        if !mask[start] {
            continue;
        }
        mask[start] = false;
        stack.push(start);
        let (mut min_x, mut min_y) = (start % w, start / w);
        let (mut max_x, mut max_y) = (min_x, min_y);

        while let Some(i) = stack.pop() {
            let (x, y) = (i % w, i / w);
            min_x = min_x.min(x);
            max_x = max_x.max(x);
            min_y = min_y.min(y);
            max_y = max_y.max(y);

            for ny in y.saturating_sub(1)..=(y + 1).min(h - 1) {
                for nx in x.saturating_sub(1)..=(x + 1).min(w - 1) {
                    let j = ny * w + nx;
                    if mask[j] {
                        mask[j] = false;
                        stack.push(j);
                    }
                }
            }
        }

        regions.push(Region {
            x: min_x as u32,
            y: min_y as u32,
            width: (max_x - min_x + 1) as u32,
            height: (max_y - min_y + 1) as u32,
        });
    }
    regions
}

impl VisionConfig {
    fn keeps(&self, region: &Region, window_area: f64) -> bool {
        region.width >= self.min_width
            && region.height >= self.min_height
            && (region.width as f64 * region.height as f64) <= self.max_area_ratio * window_area
    }
}

/// Discovers elements by segmenting a screenshot of the focused window.
pub struct VisionBackend<C> {
    capture: C,
    config: VisionConfig,
}

impl<C: ScreenCapture> VisionBackend<C> {
    pub fn new(capture: C, config: VisionConfig) -> Self {
        Self { capture, config }
    }
}

impl<C: ScreenCapture> ElementBackend for VisionBackend<C> {
    fn name(&self) -> &'static str {
        "opencv"
    }

    fn get_children(
        &mut self,
        window_system: &dyn WindowSystem,
    ) -> Result<Vec<ActionableElement>, BackendError> {
        let focused = window_system.focused_window()?;
        if !focused.extents.is_valid() {
            return Err(BackendError::NoChildren {
                application: focused.application,
            });
        }

        let start = Instant::now();
        let image = self.capture.capture(focused.extents)?;
        let window_area = image.width() as f64 * image.height() as f64;
        let origin = (focused.extents.x as f64, focused.extents.y as f64);
        let elements: Vec<ActionableElement> = detect_regions(&image)
            .iter()
            .filter(|r| self.config.keeps(r, window_area))
            .map(|r| {
                ActionableElement::from_relative_box(
                    origin,
                    r.x as f64,
                    r.y as f64,
                    r.width as f64,
                    r.height as f64,
                )
            })
            .collect();
        debug!("detected {} regions in {:?}", elements.len(), start.elapsed());

        if elements.is_empty() {
            return Err(BackendError::NoChildren {
                application: focused.application,
            });
        }
        Ok(elements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockWindowSystem;
    use image::{Luma, Rgba};

    /// White canvas with dark filled rectangles.
    fn canvas(w: u32, h: u32, rects: &[(u32, u32, u32, u32)]) -> GrayImage {
        let mut img = GrayImage::from_pixel(w, h, Luma([240]));
        for &(x, y, rw, rh) in rects {
            for yy in y..y + rh {
                for xx in x..x + rw {
                    img.put_pixel(xx, yy, Luma([20]));
                }
            }
        }
        img
    }

    struct StaticCapture(GrayImage);

    impl ScreenCapture for StaticCapture {
        fn capture(&self, region: Extents) -> Result<GrayImage, BackendError> {
            assert_eq!((region.width as u32, region.height as u32), self.0.dimensions());
            Ok(self.0.clone())
        }
    }

    #[test]
    fn crop_cuts_window_out_of_monitor_capture() {
        // Right-hand monitor of a pair, with a dark square at (40, 30) in
        // monitor pixels.
        let mut screen = RgbaImage::from_pixel(200, 100, Rgba([250, 250, 250, 255]));
        for y in 30..40 {
            for x in 40..50 {
                screen.put_pixel(x, y, Rgba([0, 0, 0, 255]));
            }
        }
        let monitor = Extents::new(1920, 0, 200, 100);
        let gray = crop_to_region(&screen, monitor, Extents::new(1950, 20, 100, 50));
        assert_eq!(gray.dimensions(), (100, 50));
        assert_eq!(gray.get_pixel(10, 10).0[0], 0);
        assert_eq!(gray.get_pixel(0, 0).0[0], 250);
        assert_eq!(detect_regions(&gray), vec![Region { x: 10, y: 10, width: 10, height: 10 }]);
    }

    #[test]
    fn crop_is_clamped_to_the_capture() {
        let screen = RgbaImage::from_pixel(100, 100, Rgba([0, 0, 0, 255]));
        let gray = crop_to_region(&screen, Extents::new(0, 0, 100, 100), Extents::new(80, 90, 50, 50));
        assert_eq!(gray.dimensions(), (20, 10));
    }

    #[test]
    fn hidpi_capture_is_scaled_to_layout_pixels() {
        let screen = RgbaImage::from_pixel(400, 200, Rgba([128, 128, 128, 255]));
        let gray = crop_to_region(&screen, Extents::new(0, 0, 200, 100), Extents::new(10, 10, 60, 40));
        assert_eq!(gray.dimensions(), (60, 40));
    }

    #[test]
    fn otsu_splits_bimodal_image() {
        let img = canvas(10, 10, &[(0, 0, 5, 10)]);
        let level = otsu_level(&img);
        assert!((20..240).contains(&level));
    }

    #[test]
    fn detects_separate_rectangles_in_raster_order() {
        let img = canvas(100, 60, &[(50, 5, 20, 10), (10, 30, 8, 6)]);
        let regions = detect_regions(&img);
        assert_eq!(
            regions,
            vec![
                Region { x: 50, y: 5, width: 20, height: 10 },
                Region { x: 10, y: 30, width: 8, height: 6 },
            ]
        );
    }

    #[test]
    fn diagonal_pixels_are_connected() {
        let mut img = GrayImage::from_pixel(10, 10, Luma([255]));
        img.put_pixel(2, 2, Luma([0]));
        img.put_pixel(3, 3, Luma([0]));
        img.put_pixel(4, 4, Luma([0]));
        let regions = detect_regions(&img);
        assert_eq!(regions, vec![Region { x: 2, y: 2, width: 3, height: 3 }]);
    }

    #[test]
    fn light_on_dark_uses_minority_class() {
        let mut img = GrayImage::from_pixel(40, 40, Luma([10]));
        for y in 10..20 {
            for x in 10..20 {
                img.put_pixel(x, y, Luma([230]));
            }
        }
        assert_eq!(
            detect_regions(&img),
            vec![Region { x: 10, y: 10, width: 10, height: 10 }]
        );
    }

    #[test]
    fn uniform_image_has_no_regions() {
        let img = GrayImage::from_pixel(20, 20, Luma([128]));
        assert!(detect_regions(&img).is_empty());
    }

    #[test]
    fn backend_filters_and_offsets_regions() {
        // One button, one speck below min size, one huge panel.
        let img = canvas(200, 100, &[(20, 20, 30, 10), (100, 80, 2, 2), (120, 0, 80, 100)]);
        let ws = MockWindowSystem::new(Extents::new(300, 200, 200, 100), 1, "app");
        let mut backend = VisionBackend::new(StaticCapture(img), VisionConfig::default());
        let elements = backend.get_children(&ws).unwrap();
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].relative_position, (35.0, 25.0));
        assert_eq!(elements[0].absolute_position, (335.0, 225.0));
    }

    #[test]
    fn blank_window_is_expected_empty() {
        let img = GrayImage::from_pixel(50, 50, Luma([200]));
        let ws = MockWindowSystem::new(Extents::new(0, 0, 50, 50), 1, "app");
        let mut backend = VisionBackend::new(StaticCapture(img), VisionConfig::default());
        assert!(matches!(
            backend.get_children(&ws),
            Err(BackendError::NoChildren { .. })
        ));
    }

    #[test]
    fn zero_sized_window_is_expected_empty() {
        let ws = MockWindowSystem::new(Extents::new(0, 0, 0, 0), 1, "app");
        let mut backend = VisionBackend::new(
            StaticCapture(GrayImage::new(0, 0)),
            VisionConfig::default(),
        );
        assert!(matches!(
            backend.get_children(&ws),
            Err(BackendError::NoChildren { .. })
        ));
    }
}
