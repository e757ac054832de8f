pub mod jpeg_file_writer;
