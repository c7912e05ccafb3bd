//! graphfs command-line front end.
//!
//! Runs one filesystem operation per invocation against a graph snapshot.
//!
//! ```bash
//! graphfs mkdir /projects
//! echo hello | graphfs write /projects/readme
//! graphfs cat /projects/readme
//! graphfs ls /.V
//! graphfs link /projects/readme /.V/<id>/EO/docs@refers
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing_subscriber::{EnvFilter, fmt};

use graphfs_kernel::{
    bootstrap, CachingFs, FileType, GraphContext, GraphFs, GraphFsConfig, MemoryGraph, OpenFlags,
    SetAttr, VfsOps,
};

/// Browse and edit a property graph as a filesystem.
#[derive(Parser, Debug)]
#[command(name = "graphfs")]
#[command(about = "Browse and edit a property graph as a filesystem")]
struct Cli {
    /// RON config file (default: <config dir>/graphfs/config.ron when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Graph snapshot file (default: <data dir>/graphfs/graph.json)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Log filter, overrides RUST_LOG (e.g. "debug", "graphfs_kernel=trace")
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
enum Command {
    /// List a folder
    Ls { path: String },
    /// Print file content
    Cat { path: String },
    /// Write to a file, creating it if needed (reads stdin without --data)
    Write {
        path: String,
        #[arg(long)]
        data: Option<String>,
        #[arg(long, default_value_t = 0)]
        offset: u64,
    },
    /// Create an empty file
    Touch { path: String },
    /// Cut a file to SIZE bytes
    Truncate { path: String, size: u64 },
    /// Set permission bits (octal)
    Chmod {
        #[arg(value_parser = parse_mode)]
        mode: u32,
        path: String,
    },
    /// Create a folder
    Mkdir { path: String },
    /// Remove a file, property or link
    Rm { path: String },
    /// Remove an empty folder
    Rmdir { path: String },
    /// Move or rename
    Mv { from: String, to: String },
    /// Create an edge link at PATH pointing to TARGET
    Link { target: String, path: String },
    /// Print a link target
    Readlink { path: String },
    /// Print attributes
    Stat { path: String },
    /// Record this host in the graph
    Register,
}

impl Command {
    fn mutates(&self) -> bool {
        !matches!(
            self,
            Command::Ls { .. }
                | Command::Cat { .. }
                | Command::Readlink { .. }
                | Command::Stat { .. }
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.log_level.as_deref() {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(cli.config.as_deref())?;
    let store = match cli.store {
        Some(store) => store,
        None => default_store()?,
    };

    let graph = Arc::new(
        MemoryGraph::open(&store)
            .with_context(|| format!("failed to open graph snapshot {}", store.display()))?,
    );
    let ctx = GraphContext::new(graph.clone(), config.clone()).context("invalid configuration")?;
    bootstrap::ensure_root(&ctx).await?;

    let mut out = Vec::new();
    match &cli.command {
        Command::Register => {
            let host = bootstrap::register(&ctx).await?;
            out.extend_from_slice(format!("{}\n", host.identifier(&ctx, false)).as_bytes());
        }
        command => {
            let fs = CachingFs::from_config(GraphFs::new(ctx), &config);
            let stdin_data = match command {
                Command::Write { data: None, .. } => {
                    let mut buf = Vec::new();
                    tokio::io::stdin().read_to_end(&mut buf).await?;
                    Some(buf)
                }
                _ => None,
            };
            execute(&fs, command, stdin_data, &mut out).await?;
        }
    }

    if cli.command.mutates() {
        if let Some(dir) = store.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        graph
            .save(&store)
            .with_context(|| format!("failed to save graph snapshot {}", store.display()))?;
        tracing::debug!(store = %store.display(), "saved graph snapshot");
    }

    let mut stdout = tokio::io::stdout();
    stdout.write_all(&out).await?;
    stdout.flush().await?;
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<GraphFsConfig> {
    let path = match path {
        Some(path) => Some(path.to_path_buf()),
        None => dirs::config_dir()
            .map(|d| d.join("graphfs").join("config.ron"))
            .filter(|p| p.exists()),
    };
    match path {
        Some(path) => GraphFsConfig::load(&path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(GraphFsConfig::default()),
    }
}

fn parse_mode(s: &str) -> Result<u32, String> {
    u32::from_str_radix(s, 8).map_err(|e| format!("invalid octal mode {s:?}: {e}"))
}

fn default_store() -> Result<PathBuf> {
    let dir = dirs::data_dir().context("no data directory for the graph snapshot; pass --store")?;
    Ok(dir.join("graphfs").join("graph.json"))
}

/// Run one filesystem command, appending its output to `out`.
async fn execute<F: VfsOps>(
    fs: &F,
    command: &Command,
    stdin_data: Option<Vec<u8>>,
    out: &mut Vec<u8>,
) -> Result<()> {
    match command {
        Command::Ls { path } => {
            for entry in fs.readdir(Path::new(path)).await? {
                let suffix = match entry.kind {
                    FileType::Directory => "/",
                    FileType::Symlink => "@",
                    FileType::File => "",
                };
                out.extend_from_slice(format!("{}{}\n", entry.name, suffix).as_bytes());
            }
        }
        Command::Cat { path } => {
            out.extend_from_slice(&fs.read_all(Path::new(path)).await?);
        }
        Command::Write { path, data, offset } => {
            let path = Path::new(path);
            let bytes = match data {
                Some(data) => data.as_bytes().to_vec(),
                None => stdin_data.unwrap_or_default(),
            };
            if !fs.exists(path).await {
                fs.create(path, 0o644).await?;
            }
            fs.open(path, OpenFlags::write()).await?;
            let written = fs.write(path, *offset, &bytes).await?;
            tracing::debug!(path = %path.display(), written, "wrote");
        }
        Command::Touch { path } => {
            let path = Path::new(path);
            if !fs.exists(path).await {
                fs.create(path, 0o644).await?;
            }
        }
        Command::Truncate { path, size } => {
            fs.setattr(Path::new(path), SetAttr::new().with_size(*size)).await?;
        }
        Command::Chmod { mode, path } => {
            fs.setattr(Path::new(path), SetAttr::new().with_perm(*mode)).await?;
        }
        Command::Mkdir { path } => {
            fs.mkdir(Path::new(path), 0o755).await?;
        }
        Command::Rm { path } => {
            fs.unlink(Path::new(path)).await?;
        }
        Command::Rmdir { path } => {
            fs.rmdir(Path::new(path)).await?;
        }
        Command::Mv { from, to } => {
            fs.rename(Path::new(from), Path::new(to)).await?;
        }
        Command::Link { target, path } => {
            fs.symlink(Path::new(path), Path::new(target)).await?;
        }
        Command::Readlink { path } => {
            let target = fs.readlink(Path::new(path)).await?;
            out.extend_from_slice(format!("{}\n", target.display()).as_bytes());
        }
        Command::Stat { path } => {
            let attr = fs.getattr(Path::new(path)).await?;
            let kind = match attr.kind {
                FileType::Directory => "folder",
                FileType::Symlink => "link",
                FileType::File => "file",
            };
            out.extend_from_slice(
                format!(
                    "kind: {kind}\nsize: {}\nmode: {:o}\nuid: {}\ngid: {}\n",
                    attr.size,
                    attr.perm,
                    attr.uid.unwrap_or_default(),
                    attr.gid.unwrap_or_default(),
                )
                .as_bytes(),
            );
        }
        Command::Register => anyhow::bail!("register is not a filesystem command"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fs() -> GraphFs {
        let ctx =
            GraphContext::new(Arc::new(MemoryGraph::new()), GraphFsConfig::default()).unwrap();
        GraphFs::new(ctx)
    }

    async fn run(fs: &GraphFs, command: Command) -> String {
        let mut out = Vec::new();
        execute(fs, &command, None, &mut out).await.unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_parse_commands() {
        let cli = Cli::parse_from(["graphfs", "--store", "/tmp/g.json", "mv", "/a", "/b"]);
        assert_eq!(cli.store, Some(PathBuf::from("/tmp/g.json")));
        assert_eq!(
            cli.command,
            Command::Mv {
                from: "/a".into(),
                to: "/b".into()
            }
        );

        let cli = Cli::parse_from(["graphfs", "write", "/a", "--data", "hi", "--offset", "3"]);
        assert_eq!(
            cli.command,
            Command::Write {
                path: "/a".into(),
                data: Some("hi".into()),
                offset: 3
            }
        );
    }

    #[test]
    fn test_mutating_commands() {
        assert!(!Command::Ls { path: "/".into() }.mutates());
        assert!(!Command::Stat { path: "/".into() }.mutates());
        assert!(Command::Mkdir { path: "/d".into() }.mutates());
        assert!(Command::Register.mutates());
    }

    #[tokio::test]
    async fn test_write_cat_ls() {
        let fs = fs();
        run(&fs, Command::Mkdir { path: "/d".into() }).await;
        run(
            &fs,
            Command::Write {
                path: "/d/f".into(),
                data: Some("hello".into()),
                offset: 0,
            },
        )
        .await;
        assert_eq!(run(&fs, Command::Cat { path: "/d/f".into() }).await, "hello");
        assert_eq!(run(&fs, Command::Ls { path: "/d".into() }).await, ".V/\nf\n");

        let stat = run(&fs, Command::Stat { path: "/d/f".into() }).await;
        assert!(stat.starts_with("kind: file\nsize: 5\nmode: 644\n"));
    }

    #[tokio::test]
    async fn test_write_from_stdin_data() {
        let fs = fs();
        let mut out = Vec::new();
        let command = Command::Write {
            path: "/f".into(),
            data: None,
            offset: 0,
        };
        execute(&fs, &command, Some(b"piped".to_vec()), &mut out)
            .await
            .unwrap();
        assert_eq!(run(&fs, Command::Cat { path: "/f".into() }).await, "piped");
    }

    #[tokio::test]
    async fn test_snapshot_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("graph.json");

        let graph = Arc::new(MemoryGraph::open(&store).unwrap());
        let ctx = GraphContext::new(graph.clone(), GraphFsConfig::default()).unwrap();
        let fs = GraphFs::new(ctx);
        run(&fs, Command::Touch { path: "/kept".into() }).await;
        graph.save(&store).unwrap();

        let graph = Arc::new(MemoryGraph::open(&store).unwrap());
        let ctx = GraphContext::new(graph, GraphFsConfig::default()).unwrap();
        let fs = GraphFs::new(ctx);
        assert_eq!(run(&fs, Command::Ls { path: "/".into() }).await, ".V/\nkept\n");
    }

    #[tokio::test]
    async fn test_chmod_and_truncate() {
        let cli = Cli::parse_from(["graphfs", "chmod", "600", "/f"]);
        assert_eq!(
            cli.command,
            Command::Chmod {
                mode: 0o600,
                path: "/f".into()
            }
        );
        assert!(Cli::try_parse_from(["graphfs", "chmod", "9", "/f"]).is_err());

        let fs = fs();
        run(
            &fs,
            Command::Write {
                path: "/f".into(),
                data: Some("hello".into()),
                offset: 0,
            },
        )
        .await;
        run(&fs, cli.command).await;
        run(
            &fs,
            Command::Truncate {
                path: "/f".into(),
                size: 2,
            },
        )
        .await;
        let stat = run(&fs, Command::Stat { path: "/f".into() }).await;
        assert!(stat.starts_with("kind: file\nsize: 2\nmode: 600\n"));
    }

    #[test]
    fn test_load_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ron");
        std::fs::write(&path, r#"(fs_ns: "test", read_only: true)"#).unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.fs_ns, "test");
        assert!(config.read_only);
    }
}
