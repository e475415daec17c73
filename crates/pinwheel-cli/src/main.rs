//! pinwheel CLI - pinned opam dependencies and Rocq build graphs

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

mod add;
mod config;
mod deps;
mod opam;
mod update;

use config::Config;
use opam::Progress;

#[derive(Parser)]
#[command(name = "pinwheel")]
#[command(version)]
#[command(about = "Manage pinned opam dependencies of Rocq projects", long_about = None)]
struct Cli {
    /// Only print results and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the pin-depends of an opam file
    Opam {
        /// Opam file (defaults to the only *.opam in the current directory)
        #[arg(short, long, global = true)]
        file: Option<PathBuf>,

        #[command(subcommand)]
        command: OpamCommands,
    },

    /// List the source files needed to build the given files
    Deps {
        /// Dependency rules produced by rocq dep
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// .v or .vo files
        files: Vec<String>,
    },

    /// List the source files that depend on the given files
    Targets {
        /// Dependency rules produced by rocq dep
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// .v or .vo files
        files: Vec<String>,
    },
}

#[derive(Subcommand)]
enum OpamCommands {
    /// Add a dependency and pin it
    ///
    /// Without a commit in the URL, the dependency is pinned to the latest
    /// commit of the default branch. An existing pin is updated.
    Add {
        /// Repository URL, optionally ending in #<commit>
        url: String,

        /// Package name (defaults to the repository's only opam file)
        #[arg(short, long)]
        package: Option<String>,
    },

    /// Move pinned dependencies to their latest commit
    Update {
        /// Only update this package
        #[arg(short, long)]
        package: Option<String>,
    },

    /// List pinned dependencies
    List,

    /// Recompute the indirect pin-depends
    Indirect,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let progress = Progress { quiet: cli.quiet };
    let config = Config::load(Path::new("."))?;

    match cli.command {
        Commands::Opam { file, command } => {
            let file = opam::manifest_path(file, Path::new("."))?;
            match command {
                OpamCommands::Add { url, package } => {
                    let options = add::AddOptions { url, package, file };
                    add::add_dependency(options, &config, progress)?;
                }

                OpamCommands::Update { package } => {
                    let options = update::UpdateOptions { package, file };
                    let result = update::update_dependencies(options, &config)?;
                    result.print_summary(progress);
                }

                OpamCommands::List => {
                    opam::list(&opam::OpamFile::open(file)?);
                }

                OpamCommands::Indirect => {
                    let result = update::update_indirect(file, &config)?;
                    result.print_summary(progress);
                }
            }
        }

        Commands::Deps { file, files } => {
            let rules = file.unwrap_or_else(|| config.rules_file());
            for source in deps::query(&rules, deps::Query::Sources, &files)? {
                println!("{source}");
            }
        }

        Commands::Targets { file, files } => {
            let rules = file.unwrap_or_else(|| config.rules_file());
            for target in deps::query(&rules, deps::Query::Dependents, &files)? {
                println!("{target}");
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_opam_add_with_package() {
        let cli = Cli::try_parse_from([
            "pinwheel",
            "opam",
            "add",
            "https://github.com/mit-pdos/perennial#577140b",
            "-p",
            "perennial",
        ])
        .unwrap();
        match cli.command {
            Commands::Opam {
                file,
                command: OpamCommands::Add { url, package },
            } => {
                assert!(file.is_none());
                assert_eq!(url, "https://github.com/mit-pdos/perennial#577140b");
                assert_eq!(package.as_deref(), Some("perennial"));
            }
            _ => panic!("Expected opam add"),
        }
    }

    #[test]
    fn test_opam_file_after_subcommand() {
        let cli = Cli::try_parse_from(["pinwheel", "opam", "update", "-f", "proj.opam", "-q"]).unwrap();
        assert!(cli.quiet);
        match cli.command {
            Commands::Opam {
                file,
                command: OpamCommands::Update { package },
            } => {
                assert_eq!(file, Some(PathBuf::from("proj.opam")));
                assert!(package.is_none());
            }
            _ => panic!("Expected opam update"),
        }
    }

    #[test]
    fn test_deps_files() {
        let cli = Cli::try_parse_from(["pinwheel", "deps", "-f", "rules.d", "A.v", "B.vo"]).unwrap();
        match cli.command {
            Commands::Deps { file, files } => {
                assert_eq!(file, Some(PathBuf::from("rules.d")));
                assert_eq!(files, ["A.v", "B.vo"]);
            }
            _ => panic!("Expected deps"),
        }
    }

    #[test]
    fn test_opam_requires_subcommand() {
        assert!(Cli::try_parse_from(["pinwheel", "opam"]).is_err());
        assert!(Cli::try_parse_from(["pinwheel", "opam", "add"]).is_err());
    }
}
