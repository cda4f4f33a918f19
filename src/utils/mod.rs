pub mod compress;
pub mod file_io;
pub mod time;
