use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

const SECRETS_DIR: &str = "secrets";

/// Plain-text secrets read once at startup. The messaging handshake and the
/// data API reject bad tokens themselves, so no format checks happen here.
pub struct Secrets {
    pub discord_token: String,
    pub alpaca_key_id: String,
    pub alpaca_secret_key: String,
}

impl Secrets {
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(SECRETS_DIR))
    }

    pub fn load_from(dir: &Path) -> Result<Self> {
        Ok(Self {
            discord_token: read_secret(&dir.join("discord_token.txt"))?,
            alpaca_key_id: read_secret(&dir.join("alpaca_key_id.txt"))?,
            alpaca_secret_key: read_secret(&dir.join("alpaca_secret_key.txt"))?,
        })
    }
}

fn read_secret(path: &Path) -> Result<String> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("cannot read secret file {}", path.display()))?;
    Ok(raw.trim().to_string())
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::read_secret;

    #[test]
    fn trims_surrounding_whitespace() {
        let dir = std::env::temp_dir().join("monke-bot-secret-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("token.txt");
        std::fs::write(&path, "  xoxb-123\n").unwrap();

        assert_eq!(read_secret(&path).unwrap(), "xoxb-123");
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = read_secret(Path::new("does/not/exist.txt")).unwrap_err();
        assert!(format!("{err:#}").contains("does/not/exist.txt"));
    }
}
