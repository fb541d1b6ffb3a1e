
use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Select};
use std::path::Path;

use super::{CompletionConfig, Config, ConfigError, OllamaConfig};

#[inline]
pub fn run_interactive_config(data_dir: &Path) -> Result<()> {
    eprintln!("{}", style("🔧 DocuSense Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config(data_dir)?;

    eprintln!("{}", style("Embedding Configuration").bold().yellow());
    eprintln!("Configure the Ollama instance used to embed document descriptions.");
    eprintln!("Changing the dimension only affects collections created afterwards.");
    eprintln!();

    configure_ollama(&mut config.ollama)?;

    eprintln!();
    eprintln!("{}", style("Completion Configuration").bold().yellow());
    eprintln!("Any OpenAI-compatible chat completion endpoint works.");
    eprintln!();

    configure_completion(&mut config.completion)?;

    eprintln!();
    eprintln!("{}", style("Testing configuration...").yellow());

    if test_ollama_connection(&config.ollama) {
        eprintln!("{}", style("✓ Ollama connection successful!").green());
    } else {
        eprintln!(
            "{}",
            style("⚠ Warning: Could not connect to Ollama").yellow()
        );
        eprintln!("You can continue, but make sure Ollama is running before ingesting files.");
    }

    if test_completion_connection(&config.completion) {
        eprintln!("{}", style("✓ Completion endpoint reachable!").green());
    } else {
        eprintln!(
            "{}",
            style("⚠ Warning: Could not reach the completion endpoint").yellow()
        );
    }

    if std::env::var(&config.completion.api_key_env).is_err() {
        eprintln!(
            "{}",
            style(format!(
                "⚠ Environment variable {} is not set",
                config.completion.api_key_env
            ))
            .yellow()
        );
    }

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config(data_dir: &Path) -> Result<()> {
    let config = Config::load(data_dir).context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Ollama Settings:").bold().yellow());
    eprintln!("  Host: {}", style(&config.ollama.host).cyan());
    eprintln!("  Port: {}", style(config.ollama.port).cyan());
    eprintln!("  Model: {}", style(&config.ollama.model).cyan());
    eprintln!(
        "  Embedding Dimension: {}",
        style(config.ollama.embedding_dimension).cyan()
    );
    match config.ollama_url() {
        Ok(url) => eprintln!("  Ollama URL: {}", style(url).cyan()),
        Err(e) => eprintln!("  Ollama URL: {} ({})", style("Invalid").red(), e),
    }

    eprintln!();
    eprintln!("{}", style("Completion Settings:").bold().yellow());
    eprintln!("  Base URL: {}", style(&config.completion.base_url).cyan());
    eprintln!("  Model: {}", style(&config.completion.model).cyan());
    eprintln!("  Max Tokens: {}", style(config.completion.max_tokens).cyan());
    eprintln!(
        "  API Key Variable: {}",
        style(&config.completion.api_key_env).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Retrieval Settings:").bold().yellow());
    eprintln!("  Default top_k: {}", style(config.retrieval.top_k).cyan());

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );
    eprintln!(
        "Vector database: {}",
        style(config.vector_database_path().display()).dim()
    );

    Ok(())
}

fn load_existing_config(data_dir: &Path) -> Result<Config> {
    Config::load(data_dir).map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("No existing configuration found. Using defaults.").yellow()
            );
            Ok(Config {
                base_dir: data_dir.to_path_buf(),
                ..Config::default()
            })
        },
        |config| {
            eprintln!("{}", style("Found existing configuration.").green());
            Ok(config)
        },
    )
}

fn configure_ollama(ollama: &mut OllamaConfig) -> Result<()> {
    let protocols = &["http", "https"];
    let default_index = protocols
        .iter()
        .position(|&p| p == ollama.protocol)
        .unwrap_or(0);

    let protocol_index = Select::new()
        .with_prompt("Ollama protocol")
        .default(default_index)
        .items(protocols)
        .interact()?;

    let protocol = protocols[protocol_index].to_string();

    let host: String = Input::new()
        .with_prompt("Ollama host")
        .default(ollama.host.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            let temp_config = OllamaConfig {
                protocol: protocol.clone(),
                host: input.clone(),
                ..OllamaConfig::default()
            };
            temp_config.validate()
        })
        .interact_text()?;

    let port: u16 = Input::new()
        .with_prompt("Ollama port")
        .default(ollama.port)
        .validate_with(|input: &u16| -> Result<(), &str> {
            if *input == 0 {
                Err("Port must be greater than 0")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let model: String = Input::new()
        .with_prompt("Embedding model")
        .default(ollama.model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let dimension: u32 = Input::new()
        .with_prompt("Embedding dimension")
        .default(ollama.embedding_dimension)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if (64..=4096).contains(input) {
                Ok(())
            } else {
                Err("Dimension must be between 64 and 4096")
            }
        })
        .interact_text()?;

    ollama.set_protocol(protocol)?;
    ollama.set_host(host)?;
    ollama.set_port(port)?;
    ollama.set_model(model)?;
    ollama.set_embedding_dimension(dimension)?;

    Ok(())
}

fn configure_completion(completion: &mut CompletionConfig) -> Result<()> {
    let base_url: String = Input::new()
        .with_prompt("Completion API base URL")
        .default(completion.base_url.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            CompletionConfig {
                base_url: input.clone(),
                ..CompletionConfig::default()
            }
            .completion_url()
            .map(|_| ())
        })
        .interact_text()?;

    let model: String = Input::new()
        .with_prompt("Completion model")
        .default(completion.model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let max_tokens: u32 = Input::new()
        .with_prompt("Maximum tokens per reply")
        .default(completion.max_tokens)
        .interact_text()?;

    completion.set_base_url(base_url)?;
    completion.set_model(model)?;
    completion.set_max_tokens(max_tokens)?;

    Ok(())
}

fn test_ollama_connection(ollama: &OllamaConfig) -> bool {
    let url = format!(
        "{}://{}:{}/api/version",
        ollama.protocol, ollama.host, ollama.port
    );

    is_reachable(&url)
}

fn test_completion_connection(completion: &CompletionConfig) -> bool {
    completion
        .completion_url()
        .ok()
        .and_then(|base| base.join("models").ok())
        .is_some_and(|url| is_reachable(url.as_str()))
}

/// A 4xx still proves the server is there (e.g. 401 without an API key)
fn is_reachable(url: &str) -> bool {
    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(std::time::Duration::from_secs(5)))
        .build()
        .into();

    match agent.get(url).call() {
        Ok(_) => true,
        Err(ureq::Error::StatusCode(code)) if (400..500).contains(&code) => true,
        Err(_) => false,
    }
}
