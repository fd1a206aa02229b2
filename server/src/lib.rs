pub mod init;
pub mod world;
