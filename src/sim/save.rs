/// High-score persistence: a single integer in a text file.
///
/// Reading never fails; a missing or unreadable file counts as 0.

use std::io;
use std::path::Path;

use tracing::{debug, info};

pub fn load_high_score(path: &Path) -> u32 {
    match std::fs::read_to_string(path) {
        Ok(text) => match text.lines().next().unwrap_or("").trim().parse() {
            Ok(score) => score,
            Err(e) => {
                debug!("ignoring unreadable high score in {}: {e}", path.display());
                0
            }
        },
        Err(e) => {
            debug!("no high score at {}: {e}", path.display());
            0
        }
    }
}

pub fn save_high_score(path: &Path, score: u32) -> io::Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
    }
    std::fs::write(path, score.to_string())?;
    info!("new high score {score} written to {}", path.display());
    Ok(())
}
