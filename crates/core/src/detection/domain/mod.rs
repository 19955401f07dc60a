pub mod plate_detector;
pub mod region_grouper;
