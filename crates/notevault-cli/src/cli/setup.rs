use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "notevault",
    bin_name = "notevault",
    version,
    disable_help_subcommand = true
)]
#[command(about = "Inspect and maintain a durable note store", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Data directory (defaults to $NOTEVAULT_DATA, then the OS data dir)
    #[arg(long, global = true, value_name = "DIR", help_heading = "Options")]
    pub data: Option<PathBuf>,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count, help_heading = "Options")]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show storage usage, backups and compression state
    Info {
        #[arg(long)]
        json: bool,
    },

    /// List stored notes
    #[command(alias = "ls")]
    List {
        #[arg(long)]
        json: bool,
    },

    /// Add a note
    Add {
        title: String,

        #[arg(short, long, default_value = "")]
        content: String,

        /// Tag to attach (repeatable)
        #[arg(short, long = "tag", value_name = "TAG")]
        tags: Vec<String>,

        #[arg(long)]
        category: Option<String>,
    },

    /// Delete a note by id
    #[command(alias = "rm")]
    Delete { id: uuid::Uuid },

    /// List backup records, oldest first
    Backups,

    /// Restore the newest valid backup over the current notes
    Restore,

    /// Drop old backups, keeping the newest N (default: max_backups)
    Prune { keep: Option<usize> },

    /// Remove every note and backup
    Clear {
        /// Required; clearing cannot be undone
        #[arg(short, long)]
        yes: bool,
    },
}

pub fn log_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_add_with_tags() {
        let cli = Cli::try_parse_from([
            "notevault", "add", "Groceries", "-c", "milk", "--tag", "home", "-t", "weekly",
            "--category", "errands",
        ])
        .unwrap();
        match cli.command {
            Commands::Add {
                title,
                content,
                tags,
                category,
            } => {
                assert_eq!(title, "Groceries");
                assert_eq!(content, "milk");
                assert_eq!(tags, vec!["home", "weekly"]);
                assert_eq!(category.as_deref(), Some("errands"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let cli = Cli::try_parse_from(["notevault", "list", "--data", "/tmp/v", "-vv"]).unwrap();
        assert_eq!(cli.data, Some(PathBuf::from("/tmp/v")));
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::List { json: false }));
    }

    #[test]
    fn test_delete_requires_uuid() {
        assert!(Cli::try_parse_from(["notevault", "delete", "not-a-uuid"]).is_err());
    }

    #[test]
    fn test_prune_keep_is_optional() {
        let cli = Cli::try_parse_from(["notevault", "prune"]).unwrap();
        assert!(matches!(cli.command, Commands::Prune { keep: None }));
        let cli = Cli::try_parse_from(["notevault", "prune", "2"]).unwrap();
        assert!(matches!(cli.command, Commands::Prune { keep: Some(2) }));
    }

    #[test]
    fn test_log_filter() {
        assert_eq!(log_filter(0), "warn");
        assert_eq!(log_filter(1), "info");
        assert_eq!(log_filter(5), "debug");
    }
}
