use bevy_log::info;
use shared::ModelSnapshot;
use std::{fs, fs::File, io::Write, path::Path};

pub fn save_snapshot(
    snapshot: &ModelSnapshot,
    file_path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let serialized = snapshot.to_ron()?;

    // Create the save folder if it does not already exist
    if let Some(parent) = file_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut file = File::create(file_path)?;
    file.write_all(serialized.as_bytes())?;
    info!(
        "Snapshot at tick {} saved to {}",
        snapshot.tick,
        file_path.display()
    );
    Ok(())
}
