use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Writes an executable shell script that stands in for a real external tool in engine
/// tests. Returns the script's path for use as an engine's binary setting.
pub fn stub_binary(dir: &Path, name: &str, script: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{script}\n")).expect("could not write stub binary");

    let mut perms = std::fs::metadata(&path)
        .expect("could not stat stub binary")
        .permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).expect("could not mark stub binary executable");

    path
}
