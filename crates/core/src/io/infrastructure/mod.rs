pub mod image_file_reader;
pub mod image_file_writer;
pub mod raw_yuv_reader;
