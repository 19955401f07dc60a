pub mod annotate_image_use_case;
pub mod detection_config;
pub mod pipeline_logger;
pub mod plate_pipeline;
