pub mod load_from_file;
pub mod save;
pub mod simulation;
