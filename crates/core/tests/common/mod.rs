#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use plate_detect_core::detection::infrastructure::cascade::HaarCascade;
use plate_detect_core::detection::infrastructure::cascade_loader;
use plate_detect_core::pipeline::detection_config::DetectionConfig;
use plate_detect_core::pipeline::plate_pipeline::PlatePipeline;
use plate_detect_core::shared::frame::{Frame, PixelFormat};
use plate_detect_core::shared::region::Region;
use plate_detect_core::shared::runtime;

pub const SCENE_WIDTH: u32 = 800;
pub const SCENE_HEIGHT: u32 = 400;

pub const PLATE: Region = Region {
    x: 300,
    y: 150,
    width: 120,
    height: 40,
};

pub fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/synthetic_plate_cascade.xml")
}

pub fn load_cascade() -> Arc<HaarCascade> {
    Arc::new(cascade_loader::load(&fixture_path()).unwrap())
}

pub fn default_pipeline() -> PlatePipeline {
    runtime::init();
    PlatePipeline::new(load_cascade(), &DetectionConfig::default()).unwrap()
}

fn inside(plate: Option<Region>, x: u32, y: u32) -> bool {
    plate.is_some_and(|p| {
        let (x, y) = (x as i32, y as i32);
        x >= p.x && x < p.right() && y >= p.y && y < p.bottom()
    })
}

/// Black RGB frame with an optional white plate.
pub fn rgb_scene(width: u32, height: u32, plate: Option<Region>) -> Frame {
    let mut data = Vec::with_capacity((width * height * 3) as usize);
    for y in 0..height {
        for x in 0..width {
            let v = if inside(plate, x, y) { 255 } else { 0 };
            data.extend_from_slice(&[v, v, v]);
        }
    }
    Frame::new(data, width, height, PixelFormat::Rgb).unwrap()
}

/// The same scene as a planar camera frame: studio-range luma, neutral chroma.
pub fn yuv_scene(width: u32, height: u32, plate: Option<Region>) -> Frame {
    let mut data = Vec::with_capacity((width * height * 3 / 2) as usize);
    for y in 0..height {
        for x in 0..width {
            data.push(if inside(plate, x, y) { 235 } else { 16 });
        }
    }
    data.resize((width * height * 3 / 2) as usize, 128);
    Frame::new(data, width, height, PixelFormat::Yuv420).unwrap()
}
