use std::fs::File;
use std::io::{self, Write};

use anyhow::Context;
use doctree_ftp::{FileSystemView, VirtualFile};

use crate::config::Command;

/// Run one session command against `view`, writing listings and downloads
/// to `out`.
pub fn run(view: &FileSystemView, command: &Command, out: &mut impl Write) -> anyhow::Result<()> {
    match command {
        Command::Ls { path } => {
            let target = view.get_file(path.as_deref().unwrap_or("."));
            if !target.exists() {
                anyhow::bail!("{}: no such file or directory", target.absolute_path());
            }
            match target.list_files() {
                Some(children) => {
                    for child in children {
                        writeln!(out, "{}", list_line(&child))?;
                    }
                }
                None => writeln!(out, "{}", list_line(&target))?,
            }
        }
        Command::Stat { path } => {
            let file = view.get_file(path);
            if !file.exists() {
                anyhow::bail!("{}: no such file or directory", file.absolute_path());
            }
            writeln!(out, "path:      {}", file.absolute_path())?;
            writeln!(out, "kind:      {}", if file.is_directory() { "directory" } else { "file" })?;
            writeln!(out, "size:      {}", file.size())?;
            writeln!(out, "modified:  {}", file.last_modified().to_rfc3339())?;
            writeln!(out, "mode:      {}", mode(&file))?;
            writeln!(out, "owner:     {}", file.owner_name())?;
            writeln!(out, "uri:       {}", file.physical_file().unwrap_or("-"))?;
        }
        Command::Get {
            path,
            offset,
            output,
        } => {
            let file = view.get_file(path);
            let mut reader = file
                .create_input_stream(*offset)
                .with_context(|| format!("{}: cannot open for reading", file.absolute_path()))?;
            let copied = match output {
                Some(local) => {
                    let mut dest = File::create(local)
                        .with_context(|| format!("Failed to create {}", local.display()))?;
                    let copied = io::copy(&mut reader, &mut dest)?;
                    dest.flush()?;
                    copied
                }
                None => io::copy(&mut reader, out)?,
            };
            tracing::debug!("Downloaded {} bytes from {}", copied, file.absolute_path());
        }
        Command::Put { file, path, offset } => {
            let mut source = File::open(file)
                .with_context(|| format!("Failed to open {}", file.display()))?;
            let target = view.get_file(path);
            let mut writer = target
                .create_output_stream(*offset)
                .with_context(|| format!("{}: cannot open for writing", target.absolute_path()))?;
            let copied = io::copy(&mut source, &mut writer)?;
            writer
                .flush()
                .with_context(|| format!("{}: upload did not complete", target.absolute_path()))?;
            tracing::info!("Uploaded {} bytes to {}", copied, target.absolute_path());
        }
        Command::Mkdir { path } => {
            let dir = view.get_file(path);
            if !dir.mkdir() {
                anyhow::bail!("{}: cannot create directory", dir.absolute_path());
            }
        }
        Command::Rm { path } => {
            let file = view.get_file(path);
            if !file.delete() {
                anyhow::bail!("{}: cannot delete", file.absolute_path());
            }
        }
        Command::Mv { from, to } => {
            let source = view.get_file(from);
            let destination = view.get_file(to);
            if !source.move_to(&destination) {
                anyhow::bail!(
                    "{} -> {}: cannot rename",
                    source.absolute_path(),
                    destination.absolute_path()
                );
            }
        }
        Command::Grant { .. } | Command::Revoke { .. } | Command::Grants => {
            anyhow::bail!("grant management does not run inside a session")
        }
    }
    Ok(())
}

/// `ls -l` style permission string.
fn mode(file: &VirtualFile) -> String {
    let kind = if file.is_directory() { 'd' } else { '-' };
    let read = if file.is_readable() { 'r' } else { '-' };
    let write = if file.is_writable() { 'w' } else { '-' };
    let exec = if file.is_directory() { 'x' } else { '-' };
    format!("{kind}{read}{write}{exec}{read}-{exec}{read}-{exec}")
}

fn list_line(file: &VirtualFile) -> String {
    format!(
        "{} {:>3} {:<10} {:<10} {:>12} {} {}",
        mode(file),
        file.link_count(),
        file.owner_name(),
        file.group_name(),
        file.size(),
        file.last_modified().format("%b %e %H:%M"),
        file.name()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use doctree_ftp::SessionUser;
    use doctree_local::LocalProvider;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn setup() -> (FileSystemView, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir(temp_dir.path().join("docs")).unwrap();
        std::fs::write(temp_dir.path().join("docs/a.txt"), b"test").unwrap();

        let provider = Arc::new(LocalProvider::in_memory());
        let capability = provider.grant(temp_dir.path()).unwrap();
        let view = FileSystemView::new(provider, capability, SessionUser::new("tester"));
        (view, temp_dir)
    }

    fn run_to_string(view: &FileSystemView, command: Command) -> anyhow::Result<String> {
        let mut out = Vec::new();
        run(view, &command, &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_ls_lists_children() {
        let (view, _temp_dir) = setup();
        let listing = run_to_string(
            &view,
            Command::Ls {
                path: Some("/docs".to_string()),
            },
        )
        .unwrap();

        assert_eq!(listing.lines().count(), 1);
        assert!(listing.starts_with("-rw-"));
        assert!(listing.contains("tester"));
        assert!(listing.trim_end().ends_with("a.txt"));
    }

    #[test]
    fn test_ls_missing_fails() {
        let (view, _temp_dir) = setup();
        let result = run_to_string(
            &view,
            Command::Ls {
                path: Some("/nope".to_string()),
            },
        );
        assert!(result.unwrap_err().to_string().contains("no such file"));
    }

    #[test]
    fn test_get_with_offset() {
        let (view, _temp_dir) = setup();
        let content = run_to_string(
            &view,
            Command::Get {
                path: "/docs/a.txt".to_string(),
                offset: 1,
                output: None,
            },
        )
        .unwrap();
        assert_eq!(content, "est");
    }

    #[test]
    fn test_put_mkdir_mv_rm() {
        let (view, temp_dir) = setup();
        let local = temp_dir.path().join("upload-source.txt");
        std::fs::write(&local, b"payload").unwrap();

        run_to_string(
            &view,
            Command::Mkdir {
                path: "/inbox".to_string(),
            },
        )
        .unwrap();
        run_to_string(
            &view,
            Command::Put {
                file: local,
                path: "/inbox/new.txt".to_string(),
                offset: 0,
            },
        )
        .unwrap();
        assert_eq!(
            std::fs::read(temp_dir.path().join("inbox/new.txt")).unwrap(),
            b"payload"
        );

        run_to_string(
            &view,
            Command::Mv {
                from: "/inbox/new.txt".to_string(),
                to: "/inbox/renamed.txt".to_string(),
            },
        )
        .unwrap();
        assert!(temp_dir.path().join("inbox/renamed.txt").exists());

        run_to_string(
            &view,
            Command::Rm {
                path: "/inbox".to_string(),
            },
        )
        .unwrap();
        assert!(!temp_dir.path().join("inbox").exists());
    }

    #[test]
    fn test_root_cannot_be_removed_or_renamed() {
        let (view, temp_dir) = setup();
        let rm = run_to_string(
            &view,
            Command::Rm {
                path: "/".to_string(),
            },
        );
        assert!(rm.unwrap_err().to_string().contains("cannot delete"));

        let mv = run_to_string(
            &view,
            Command::Mv {
                from: "/".to_string(),
                to: "/elsewhere".to_string(),
            },
        );
        assert!(mv.is_err());
        assert!(temp_dir.path().join("docs/a.txt").exists());

        // The same view keeps serving commands afterwards
        let listing = run_to_string(&view, Command::Ls { path: None }).unwrap();
        assert!(listing.trim_end().ends_with("docs"));
    }

    #[test]
    fn test_stat_reports_owner() {
        let (view, _temp_dir) = setup();
        let stat = run_to_string(
            &view,
            Command::Stat {
                path: "docs/a.txt".to_string(),
            },
        )
        .unwrap();
        assert!(stat.contains("path:      /docs/a.txt"));
        assert!(stat.contains("size:      4"));
        assert!(stat.contains("owner:     tester"));
    }
}
