//! Session-oriented transport over plain FTP.

use crate::error::{TransportError, TransportResult};
use crate::transport::{error_stream, KeyStream, Transport};
use parking_lot::Mutex;
use std::fs::File;
use std::io::{self, Seek, SeekFrom};
use std::path::Path;
use suppaftp::types::FileType;
use suppaftp::{FtpError, FtpStream, Status};

/// FTP transport.
///
/// Authenticates once at construction and keeps the live session for its
/// lifetime; the session is serialized behind a mutex because the FTP
/// control connection handles one command at a time.
pub struct FtpTransport {
    conn: Mutex<FtpStream>,
    sub_dir: String,
}

impl FtpTransport {
    /// Connects to `addr` (host:port), logs in, and switches the session
    /// to binary transfers. All keys are placed under `sub_dir` on the
    /// server.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Auth`] when the server rejects the
    /// credentials; fatal at startup.
    pub fn connect(addr: &str, user: &str, password: &str, sub_dir: &str) -> TransportResult<Self> {
        let mut stream = FtpStream::connect(addr)?;
        stream
            .login(user, password)
            .map_err(|e| TransportError::auth(e.to_string()))?;
        stream.transfer_type(FileType::Binary)?;
        Ok(Self {
            conn: Mutex::new(stream),
            sub_dir: sub_dir.trim_matches('/').to_owned(),
        })
    }

    fn remote_path(&self, key: &str) -> String {
        join_remote(&self.sub_dir, key)
    }

    /// Creates every intermediate directory of `remote`, ignoring failures:
    /// the directories may already exist, and a genuinely broken path will
    /// fail the retried write anyway.
    fn make_parents(&self, conn: &mut FtpStream, remote: &str) {
        for dir in parent_dirs(remote) {
            if let Err(err) = conn.mkdir(&dir) {
                tracing::debug!(%dir, %err, "mkdir skipped");
            }
        }
    }
}

/// Every proper directory prefix of a remote path, shallowest first. The
/// final component is the file itself and is excluded.
fn parent_dirs(remote: &str) -> Vec<String> {
    let mut dirs = Vec::new();
    let mut partial = String::new();
    for part in remote.split('/').filter(|p| !p.is_empty()) {
        if !partial.is_empty() {
            partial.push('/');
        }
        partial.push_str(part);
        if partial != remote {
            dirs.push(partial.clone());
        }
    }
    dirs
}

impl Transport for FtpTransport {
    fn upload(&self, local: &Path, key: &str) -> TransportResult<()> {
        let remote = self.remote_path(key);
        let mut conn = self.conn.lock();
        let mut file = File::open(local)?;

        match conn.put_file(&remote, &mut file) {
            Ok(_) => Ok(()),
            Err(err) if is_missing_path(&err) => {
                // The snapshot directory does not exist yet; create it and
                // retry the write exactly once.
                self.make_parents(&mut conn, &remote);
                file.seek(SeekFrom::Start(0))?;
                conn.put_file(&remote, &mut file)?;
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    fn download(&self, key: &str, local: &Path) -> TransportResult<()> {
        let remote = self.remote_path(key);
        let mut conn = self.conn.lock();
        let mut output = File::create(local)?;
        let mut stream = conn.retr_as_stream(&remote)?;
        io::copy(&mut stream, &mut output)?;
        conn.finalize_retr_stream(stream)?;
        Ok(())
    }

    fn list(&self, prefix: &str) -> KeyStream<'_> {
        let dir = self.remote_path(prefix.trim_end_matches('/'));
        let names = {
            let mut conn = self.conn.lock();
            conn.nlst(if dir.is_empty() { None } else { Some(&dir) })
        };
        match names {
            Ok(names) => {
                let prefix = prefix.to_owned();
                Box::new(names.into_iter().map(move |name| {
                    // Servers differ on whether NLST returns full paths.
                    let leaf = name.rsplit('/').next().unwrap_or(name.as_str());
                    Ok(format!("{prefix}{leaf}"))
                }))
            }
            Err(err) => error_stream(err.into()),
        }
    }

    fn rename(&self, old_key: &str, new_key: &str) -> TransportResult<()> {
        let mut conn = self.conn.lock();
        conn.rename(&self.remote_path(old_key), &self.remote_path(new_key))?;
        Ok(())
    }
}

/// Joins the configured base directory and a key into a remote path.
fn join_remote(sub_dir: &str, key: &str) -> String {
    if sub_dir.is_empty() {
        key.to_owned()
    } else if key.is_empty() {
        sub_dir.to_owned()
    } else {
        format!("{sub_dir}/{key}")
    }
}

/// True for the 550 reply an FTP server gives when the target path's
/// directory does not exist.
fn is_missing_path(err: &FtpError) -> bool {
    matches!(err, FtpError::UnexpectedResponse(response) if response.status == Status::FileUnavailable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use suppaftp::types::Response;

    #[test]
    fn remote_paths_are_joined_under_sub_dir() {
        assert_eq!(join_remote("saves", "item/a.zip"), "saves/item/a.zip");
        assert_eq!(join_remote("", "item/a.zip"), "item/a.zip");
        assert_eq!(join_remote("saves", ""), "saves");
    }

    #[test]
    fn only_550_replies_count_as_missing_path() {
        let missing = FtpError::UnexpectedResponse(Response {
            status: Status::FileUnavailable,
            body: b"550 No such file or directory".to_vec(),
        });
        assert!(is_missing_path(&missing));

        // Other permanent failures must not trigger the mkdir retry.
        let denied = FtpError::UnexpectedResponse(Response {
            status: Status::NotLoggedIn,
            body: b"530 Please login".to_vec(),
        });
        assert!(!is_missing_path(&denied));
        assert!(!is_missing_path(&FtpError::BadResponse));
    }

    #[test]
    fn parent_dirs_enumerates_proper_prefixes_shallowest_first() {
        assert_eq!(
            parent_dirs("saves/item/20240101000000.zip"),
            vec!["saves", "saves/item"]
        );
        assert_eq!(parent_dirs("item/a.zip"), vec!["item"]);
        assert!(parent_dirs("a.zip").is_empty());
        assert!(parent_dirs("").is_empty());
    }
}
