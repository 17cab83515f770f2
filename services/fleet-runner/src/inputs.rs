//! Account and proxy list files
//!
//! Both are newline-delimited; lines are trimmed and blank lines skipped.

use std::path::Path;

use rewards_api::Egress;
use tracing::{info, warn};

fn read_lines(path: &Path) -> std::io::Result<Vec<String>> {
    let contents = std::fs::read_to_string(path)?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect())
}

/// Wallet addresses in file order. Missing file or no addresses is fatal.
pub fn read_accounts(path: &Path) -> common::Result<Vec<String>> {
    let addresses = read_lines(path).map_err(|e| common::Error::Input {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    if addresses.is_empty() {
        return Err(common::Error::Input {
            path: path.to_path_buf(),
            reason: "no account addresses found".into(),
        });
    }
    info!(path = %path.display(), accounts = addresses.len(), "accounts loaded");
    Ok(addresses)
}

/// Egress slots in file order.
///
/// A missing file means no egress for anyone. Entries with an unrecognized
/// scheme stay in the list as `None` so the slot arithmetic is unchanged.
pub fn read_proxies(path: &Path) -> common::Result<Vec<Option<Egress>>> {
    let lines = match read_lines(path) {
        Ok(lines) => lines,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "proxy file not found, running without egress");
            return Ok(Vec::new());
        }
        Err(e) => {
            return Err(common::Error::Input {
                path: path.to_path_buf(),
                reason: e.to_string(),
            });
        }
    };

    let slots: Vec<Option<Egress>> = lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let egress = Egress::parse(line);
            if egress.is_none() {
                warn!(line = i + 1, "unrecognized proxy entry, slot will connect directly");
            }
            egress
        })
        .collect();
    info!(
        path = %path.display(),
        proxies = slots.len(),
        usable = slots.iter().filter(|s| s.is_some()).count(),
        "proxies loaded"
    );
    Ok(slots)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn accounts_are_trimmed_and_ordered() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "accounts.txt", "0xAAA\n\n  0xBBB  \r\n\n0xAAA\n");
        assert_eq!(read_accounts(&path).unwrap(), ["0xAAA", "0xBBB", "0xAAA"]);
    }

    #[test]
    fn empty_account_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "accounts.txt", "\n   \n");
        let err = read_accounts(&path).unwrap_err();
        assert!(err.to_string().contains("no account addresses"), "got: {err}");
    }

    #[test]
    fn missing_account_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let result = read_accounts(&dir.path().join("nope.txt"));
        assert!(matches!(result, Err(common::Error::Input { .. })));
    }

    #[test]
    fn missing_proxy_file_means_no_egress() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_proxies(&dir.path().join("nope.txt")).unwrap().is_empty());
    }

    #[test]
    fn proxy_schemes_are_classified() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "proxies.txt",
            "http://user:pw@p1:3128\nhttps://p2:443\n\nsocks4://p3:1080\nsocks5://p4:1080\nftp://p5:21\n",
        );
        let slots = read_proxies(&path).unwrap();
        assert_eq!(slots.len(), 5);
        assert!(matches!(slots[0], Some(Egress::Http(_))));
        assert!(matches!(slots[1], Some(Egress::Http(_))));
        assert!(matches!(slots[2], Some(Egress::Socks4(_))));
        assert!(matches!(slots[3], Some(Egress::Socks5(_))));
        assert!(slots[4].is_none());
    }
}
