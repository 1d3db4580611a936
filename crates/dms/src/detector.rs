//! Face and eye region locators

use std::borrow::Cow;

use frame_decoder::{GrayFrame, Region};
use image::Luma;
use imageproc::definitions::Image;
use imageproc::integral_image::{integral_image, integral_squared_image};
use inference_engine::{BinaryClassifier, InputLayout, OnnxClassifier};
use tracing::{debug, info, warn};

use crate::{DetectorParams, DmsConfig, DmsError};

/// Relative tolerance for merging raw window hits into one detection
const GROUP_EPS: f64 = 0.2;

/// Locates faces in a frame and eyes within a face crop.
///
/// Eye regions are relative to the face sub-buffer they were found in.
pub trait RegionLocator: Send + Sync {
    fn detect_faces(&self, frame: &GrayFrame) -> Result<Vec<Region>, DmsError>;

    fn detect_eyes(&self, face: &GrayFrame) -> Result<Vec<Region>, DmsError>;

    /// Short name for health/status output
    fn kind(&self) -> &'static str;
}

/// Locator used when no detector models are available. Finds nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLocator;

impl RegionLocator for NullLocator {
    fn detect_faces(&self, _frame: &GrayFrame) -> Result<Vec<Region>, DmsError> {
        Ok(Vec::new())
    }

    fn detect_eyes(&self, _face: &GrayFrame) -> Result<Vec<Region>, DmsError> {
        Ok(Vec::new())
    }

    fn kind(&self) -> &'static str {
        "disabled"
    }
}

/// Multi-scale sliding-window detector over a window classifier
pub struct WindowDetector {
    scorer: Box<dyn BinaryClassifier>,
    params: DetectorParams,
}

impl WindowDetector {
    pub fn new(scorer: Box<dyn BinaryClassifier>, params: DetectorParams) -> Self {
        Self { scorer, params }
    }

    /// Load the ONNX window model named in `params`
    pub fn load(params: &DetectorParams, name: &str) -> Result<Self, DmsError> {
        let path = params
            .model_path
            .as_ref()
            .ok_or_else(|| DmsError::Detection(format!("no {name} detector model configured")))?;

        let scorer = OnnxClassifier::load(
            path,
            params.window_width,
            params.window_height,
            InputLayout::Nchw,
        )?;
        info!("Loaded {} detector from {}", name, scorer.model_path());

        Ok(Self::new(Box::new(scorer), params.clone()))
    }

    /// Detect objects, best-supported first
    pub fn detect(&self, frame: &GrayFrame) -> Result<Vec<Region>, DmsError> {
        let (win_w, win_h) = self.scorer.input_size();
        if win_w == 0 || win_h == 0 {
            return Err(DmsError::Config("detector window size must be non-zero".into()));
        }
        if !(self.params.scale_factor > 1.0) {
            return Err(DmsError::Config(format!(
                "scale_factor must be > 1.0, got {}",
                self.params.scale_factor
            )));
        }

        // Smallest scale whose window covers the minimum object size
        let mut scale = (self.params.min_width as f64 / win_w as f64)
            .max(self.params.min_height as f64 / win_h as f64)
            .max(1.0);

        let mut hits = Vec::new();
        loop {
            let level_w = (frame.width as f64 / scale).floor() as u32;
            let level_h = (frame.height as f64 / scale).floor() as u32;
            if level_w < win_w || level_h < win_h {
                break;
            }

            let level = if (level_w, level_h) == (frame.width, frame.height) {
                Cow::Borrowed(frame)
            } else {
                match frame.resize(level_w, level_h) {
                    Some(resized) => Cow::Owned(resized),
                    None => break,
                }
            };

            self.scan_level(&level, scale, &mut hits)?;
            scale *= self.params.scale_factor;
        }

        let grouped = group_rectangles(&hits, self.params.min_neighbors, GROUP_EPS);
        debug!("{} raw window hits grouped into {} detections", hits.len(), grouped.len());
        Ok(grouped)
    }

    fn scan_level(
        &self,
        level: &GrayFrame,
        scale: f64,
        hits: &mut Vec<Region>,
    ) -> Result<(), DmsError> {
        let (win_w, win_h) = self.scorer.input_size();
        let img = level
            .to_image()
            .ok_or_else(|| DmsError::Detection("pyramid level has an inconsistent buffer".into()))?;

        let sums = integral_image::<_, u64>(&img);
        let squares = integral_squared_image::<_, u64>(&img);
        let n = (win_w as f64) * (win_h as f64);
        let step = self.params.step.max(1) as usize;

        for y in (0..=level.height - win_h).step_by(step) {
            for x in (0..=level.width - win_w).step_by(step) {
                let mean = window_sum(&sums, x, y, win_w, win_h) as f64 / n;
                let mean_sq = window_sum(&squares, x, y, win_w, win_h) as f64 / n;
                let stddev = (mean_sq - mean * mean).max(0.0).sqrt();
                if stddev < self.params.min_stddev {
                    continue;
                }

                let Some(window) = level.crop(&Region::new(x, y, win_w, win_h)) else {
                    continue;
                };
                let result = self.scorer.predict(&window)?;
                if result.score >= self.params.score_threshold {
                    hits.push(Region::new(
                        (x as f64 * scale).round() as u32,
                        (y as f64 * scale).round() as u32,
                        (win_w as f64 * scale).round() as u32,
                        (win_h as f64 * scale).round() as u32,
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Sum of the `w` x `h` window at (x, y) from a zero-padded integral image
fn window_sum(ii: &Image<Luma<u64>>, x: u32, y: u32, w: u32, h: u32) -> u64 {
    let at = |px: u32, py: u32| ii.get_pixel(px, py)[0];
    (at(x + w, y + h) + at(x, y)) - (at(x + w, y) + at(x, y + h))
}

fn similar(a: &Region, b: &Region, eps: f64) -> bool {
    let delta = eps * (a.width.min(b.width) + a.height.min(b.height)) as f64 * 0.5;
    let close = |p: u32, q: u32| (p as f64 - q as f64).abs() <= delta;
    close(a.x, b.x)
        && close(a.y, b.y)
        && close(a.right(), b.right())
        && close(a.bottom(), b.bottom())
}

fn find(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

#[derive(Default)]
struct Cluster {
    count: u32,
    x: u64,
    y: u64,
    width: u64,
    height: u64,
}

impl Cluster {
    fn add(&mut self, r: &Region) {
        self.count += 1;
        self.x += r.x as u64;
        self.y += r.y as u64;
        self.width += r.width as u64;
        self.height += r.height as u64;
    }

    fn mean(&self) -> Region {
        let n = self.count.max(1) as f64;
        let avg = |v: u64| (v as f64 / n).round() as u32;
        Region::new(avg(self.x), avg(self.y), avg(self.width), avg(self.height))
    }
}

/// Merge overlapping raw hits.
///
/// Clusters with more than `min_neighbors` members become their averaged
/// rectangle, ordered by member count (largest first, ties in scan order).
/// With `min_neighbors == 0` the raw hits are returned untouched.
pub(crate) fn group_rectangles(hits: &[Region], min_neighbors: u32, eps: f64) -> Vec<Region> {
    if min_neighbors == 0 {
        return hits.to_vec();
    }

    let mut parent: Vec<usize> = (0..hits.len()).collect();
    for i in 0..hits.len() {
        for j in (i + 1)..hits.len() {
            if similar(&hits[i], &hits[j], eps) {
                let a = find(&mut parent, i);
                let b = find(&mut parent, j);
                if a != b {
                    parent[b] = a;
                }
            }
        }
    }

    let mut slot = vec![usize::MAX; hits.len()];
    let mut clusters: Vec<Cluster> = Vec::new();
    for (i, hit) in hits.iter().enumerate() {
        let root = find(&mut parent, i);
        if slot[root] == usize::MAX {
            slot[root] = clusters.len();
            clusters.push(Cluster::default());
        }
        clusters[slot[root]].add(hit);
    }

    let mut grouped: Vec<(u32, Region)> = clusters
        .iter()
        .filter(|c| c.count > min_neighbors)
        .map(|c| (c.count, c.mean()))
        .collect();
    grouped.sort_by(|a, b| b.0.cmp(&a.0));
    grouped.into_iter().map(|(_, r)| r).collect()
}

/// Face detector followed by an eye detector on the face crop
pub struct CascadeLocator {
    faces: WindowDetector,
    eyes: WindowDetector,
}

impl CascadeLocator {
    pub fn new(faces: WindowDetector, eyes: WindowDetector) -> Self {
        Self { faces, eyes }
    }

    /// Load both window models from configuration
    pub fn load(config: &DmsConfig) -> Result<Self, DmsError> {
        Ok(Self::new(
            WindowDetector::load(&config.face_detector, "face")?,
            WindowDetector::load(&config.eye_detector, "eye")?,
        ))
    }

    /// Cascade locator if both models load, otherwise the null locator
    pub fn load_or_disabled(config: &DmsConfig) -> Box<dyn RegionLocator> {
        match Self::load(config) {
            Ok(locator) => Box::new(locator),
            Err(e) => {
                warn!("Region locator unavailable ({}). Frames will carry no eye evidence.", e);
                Box::new(NullLocator)
            }
        }
    }
}

impl RegionLocator for CascadeLocator {
    fn detect_faces(&self, frame: &GrayFrame) -> Result<Vec<Region>, DmsError> {
        self.faces.detect(frame)
    }

    fn detect_eyes(&self, face: &GrayFrame) -> Result<Vec<Region>, DmsError> {
        self.eyes.detect(face)
    }

    fn kind(&self) -> &'static str {
        "cascade"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inference_engine::{InferenceError, InferenceResult};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Scores a window by its fraction of bright pixels
    struct BrightScorer {
        size: u32,
        calls: Arc<AtomicUsize>,
    }

    impl BinaryClassifier for BrightScorer {
        fn input_size(&self) -> (u32, u32) {
            (self.size, self.size)
        }

        fn predict(&self, input: &GrayFrame) -> Result<InferenceResult, InferenceError> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            let bright = input.data.iter().filter(|&&v| v > 128).count();
            Ok(InferenceResult {
                score: bright as f32 / input.data.len() as f32,
                latency_us: 0,
            })
        }
    }

    fn scorer(size: u32) -> (Box<BrightScorer>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (Box::new(BrightScorer { size, calls: calls.clone() }), calls)
    }

    fn params(min_neighbors: u32) -> DetectorParams {
        DetectorParams {
            window_width: 8,
            window_height: 8,
            min_width: 8,
            min_height: 8,
            min_neighbors,
            step: 1,
            score_threshold: 0.9,
            min_stddev: 0.0,
            ..DetectorParams::face()
        }
    }

    fn frame_with_square(x0: u32, y0: u32, side: u32) -> GrayFrame {
        let mut frame = GrayFrame::filled(48, 48, 10);
        for y in y0..y0 + side {
            for x in x0..x0 + side {
                frame.data[(y * 48 + x) as usize] = 230;
            }
        }
        frame
    }

    #[test]
    fn test_detects_bright_square() {
        let (scorer, _) = scorer(8);
        let detector = WindowDetector::new(scorer, params(2));

        let faces = detector.detect(&frame_with_square(16, 20, 12)).unwrap();
        assert!(!faces.is_empty());

        let best = faces[0];
        assert!(best.x >= 14 && best.x <= 22, "x = {}", best.x);
        assert!(best.y >= 18 && best.y <= 26, "y = {}", best.y);
    }

    #[test]
    fn test_dark_frame_has_no_detections() {
        let (scorer, _) = scorer(8);
        let detector = WindowDetector::new(scorer, params(2));
        assert!(detector.detect(&GrayFrame::filled(48, 48, 10)).unwrap().is_empty());
    }

    #[test]
    fn test_frame_smaller_than_min_size() {
        let (scorer, calls) = scorer(8);
        let detector = WindowDetector::new(
            scorer,
            DetectorParams {
                min_width: 80,
                min_height: 80,
                ..params(0)
            },
        );

        assert!(detector.detect(&GrayFrame::filled(48, 48, 250)).unwrap().is_empty());
        assert_eq!(calls.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_flat_windows_are_skipped() {
        let (scorer, calls) = scorer(8);
        let detector = WindowDetector::new(
            scorer,
            DetectorParams {
                min_stddev: 4.0,
                ..params(0)
            },
        );

        assert!(detector.detect(&GrayFrame::filled(32, 32, 250)).unwrap().is_empty());
        assert_eq!(calls.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_group_rectangles_min_neighbors() {
        let hits = vec![
            Region::new(10, 10, 20, 20),
            Region::new(11, 10, 20, 20),
            Region::new(10, 11, 20, 20),
            Region::new(100, 100, 20, 20),
        ];

        let grouped = group_rectangles(&hits, 2, GROUP_EPS);
        assert_eq!(grouped, vec![Region::new(10, 10, 20, 20)]);

        // Single outlier survives only when no grouping is requested
        assert_eq!(group_rectangles(&hits, 0, GROUP_EPS).len(), 4);
        assert!(group_rectangles(&hits, 3, GROUP_EPS).is_empty());
    }

    #[test]
    fn test_group_rectangles_strongest_first() {
        let mut hits = vec![Region::new(0, 0, 10, 10), Region::new(1, 0, 10, 10)];
        hits.extend((0..4).map(|i| Region::new(50 + i, 50, 10, 10)));

        let grouped = group_rectangles(&hits, 1, GROUP_EPS);
        assert_eq!(grouped.len(), 2);
        assert!(grouped[0].x >= 50);
        assert!(grouped[1].x <= 1);
    }

    #[test]
    fn test_null_locator() {
        let frame = GrayFrame::filled(32, 32, 128);
        assert!(NullLocator.detect_faces(&frame).unwrap().is_empty());
        assert!(NullLocator.detect_eyes(&frame).unwrap().is_empty());
        assert_eq!(NullLocator.kind(), "disabled");
    }

    #[test]
    fn test_missing_models_fall_back_to_null_locator() {
        let locator = CascadeLocator::load_or_disabled(&DmsConfig::default());
        assert_eq!(locator.kind(), "disabled");
    }
}
