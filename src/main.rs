use anyhow::Result;
use clap::{Parser, Subcommand};
use docusense::commands::{
    add_documents, delete_collection, list_collections, query_collection, show_status,
};
use docusense::config::{resolve_data_dir, run_interactive_config, show_config};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "docusense")]
#[command(about = "Ask questions about your documents with retrieval-augmented answers")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml and the vector database (default: ~/.docusense)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the embedding and completion endpoints
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Describe and index documents into a collection
    Add {
        /// Collection to add the documents to
        collection: String,
        /// Files or directories (PDF, TXT, CSV, XLSX, PNG, JPG, JPEG, GIF)
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Answer a question from the documents of a collection
    Query {
        collection: String,
        /// The question to answer
        text: String,
        /// Number of documents to retrieve (default from config)
        #[arg(long)]
        top_k: Option<usize>,
        /// Log every retrieved document
        #[arg(long)]
        verbose: bool,
    },
    /// Delete a collection and all of its documents
    Delete { collection: String },
    /// List collections with their document counts
    List,
    /// Show configuration and connectivity status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let data_dir = resolve_data_dir(cli.data_dir)?;

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config(&data_dir)?;
            } else {
                run_interactive_config(&data_dir)?;
            }
        }
        Commands::Add { collection, paths } => {
            add_documents(&data_dir, &collection, &paths).await?;
        }
        Commands::Query {
            collection,
            text,
            top_k,
            verbose,
        } => {
            query_collection(&data_dir, &collection, &text, top_k, verbose).await?;
        }
        Commands::Delete { collection } => {
            delete_collection(&data_dir, &collection).await?;
        }
        Commands::List => {
            list_collections(&data_dir).await?;
        }
        Commands::Status => {
            show_status(&data_dir).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn cli_parsing() {
        let cli = Cli::try_parse_from(["docusense", "list"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            assert!(matches!(parsed.command, Commands::List));
            assert_eq!(parsed.data_dir, None);
        }
    }

    #[test]
    fn add_command_with_paths() {
        let cli = Cli::try_parse_from(["docusense", "add", "docs", "a.pdf", "b.txt"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Add { collection, paths } = parsed.command {
                assert_eq!(collection, "docs");
                assert_eq!(paths, vec![PathBuf::from("a.pdf"), PathBuf::from("b.txt")]);
            } else {
                panic!("expected add command");
            }
        }
    }

    #[test]
    fn add_command_requires_paths() {
        let cli = Cli::try_parse_from(["docusense", "add", "docs"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        }
    }

    #[test]
    fn query_command_with_options() {
        let cli = Cli::try_parse_from([
            "docusense",
            "query",
            "docs",
            "what is in the apple pie?",
            "--top-k",
            "5",
            "--verbose",
        ]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Query {
                collection,
                text,
                top_k,
                verbose,
            } = parsed.command
            {
                assert_eq!(collection, "docs");
                assert_eq!(text, "what is in the apple pie?");
                assert_eq!(top_k, Some(5));
                assert!(verbose);
            } else {
                panic!("expected query command");
            }
        }
    }

    #[test]
    fn global_data_dir() {
        let cli = Cli::try_parse_from(["docusense", "delete", "docs", "--data-dir", "/tmp/ds"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            assert_eq!(parsed.data_dir, Some(PathBuf::from("/tmp/ds")));
            assert!(matches!(parsed.command, Commands::Delete { .. }));
        }
    }

    #[test]
    fn config_show_flag() {
        let cli = Cli::try_parse_from(["docusense", "config", "--show"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Config { show } = parsed.command {
                assert!(show);
            }
        }
    }

    #[test]
    fn invalid_command() {
        let cli = Cli::try_parse_from(["docusense", "invalid"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
        }
    }

    #[test]
    fn help_message() {
        let cli = Cli::try_parse_from(["docusense", "--help"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        }
    }
}
