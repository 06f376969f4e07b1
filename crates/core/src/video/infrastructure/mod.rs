pub mod ffmpeg_reader;
pub(crate) mod ffmpeg_support;
pub mod image_file_reader;
pub mod image_file_writer;
