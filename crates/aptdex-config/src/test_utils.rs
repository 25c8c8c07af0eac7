use std::path::PathBuf;

use crate::config::CONFIG_PATH;

/// Runs `f` with [`CONFIG_PATH`] pointing at `path`, restoring the previous value after.
#[cfg(test)]
pub fn with_config_path<F>(path: PathBuf, f: F)
where
    F: FnOnce(),
{
    let previous = {
        let mut config_path = CONFIG_PATH.write().unwrap();
        std::mem::replace(&mut *config_path, path)
    };

    f();

    let mut config_path = CONFIG_PATH.write().unwrap();
    *config_path = previous;
}
