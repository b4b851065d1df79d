//! Auditable loop artifacts with digest verification.
//!
//! Layout under the artifact directory:
//!
//! ```text
//! <dir>/<run_id>/loop.json     serialized LoopState
//! <dir>/<run_id>/loop.digest   sha256 of loop.json
//! <dir>/<run_id>/gen_000.ttl   one file per accepted candidate
//! ```

use std::path::{Path, PathBuf};

use crate::domain::{ArtifactError, ContentDigest, Result};
use crate::orchestrator::LoopState;

/// Write the loop artifact set and return the path of `loop.json`.
pub fn write_loop_artifact(state: &LoopState, dir: &Path) -> Result<PathBuf> {
    let run_dir = dir.join(state.run_id());
    std::fs::create_dir_all(&run_dir)?;

    let artifact_path = run_dir.join("loop.json");
    let digest_path = run_dir.join("loop.digest");
    let json = serde_json::to_vec_pretty(state)?;
    let digest = ContentDigest::from_bytes(&json).as_str().to_string();

    std::fs::write(&artifact_path, &json)?;
    std::fs::write(&digest_path, digest.as_bytes())?;

    for candidate in state.candidates() {
        let path = run_dir.join(candidate_file_name(candidate.generation()));
        std::fs::write(path, candidate.text())?;
    }

    Ok(artifact_path)
}

/// Read and verify `<dir>/<run_id>/loop.json` integrity.
pub fn read_loop_artifact(run_id: &str, dir: &Path) -> Result<LoopState> {
    let run_dir = dir.join(run_id);
    let artifact_path = run_dir.join("loop.json");
    let digest_path = run_dir.join("loop.digest");

    let json = std::fs::read(&artifact_path)?;
    let digest = std::fs::read_to_string(&digest_path)?;
    let actual = ContentDigest::from_bytes(&json).as_str().to_string();
    if digest.trim() != actual {
        return Err(ArtifactError::DigestMismatch {
            expected: digest.trim().to_string(),
            actual,
        });
    }

    Ok(serde_json::from_slice(&json)?)
}

pub fn candidate_file_name(generation: u32) -> String {
    format!("gen_{generation:03}.ttl")
}
