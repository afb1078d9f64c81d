use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input};

use super::{Config, ConfigError, OllamaConfig, SearchConfig, VectorVariant};

#[inline]
pub fn run_interactive_config() -> Result<()> {
    println!("{}", style("🔧 FAQ Search Configuration Setup").bold().cyan());
    println!();

    let mut config = load_existing_config()?;

    println!("{}", style("Ollama Configuration").bold().yellow());
    println!("Configure your local Ollama instance for query embedding.");
    println!();

    configure_ollama(&mut config.ollama)?;

    println!();
    println!("{}", style("Search Configuration").bold().yellow());
    configure_search(&mut config.search)?;

    println!();
    println!("{}", style("Testing configuration...").yellow());

    if test_ollama_connection(&config.ollama) {
        println!("{}", style("✓ Ollama connection successful!").green());
    } else {
        println!(
            "{}",
            style("⚠ Warning: Could not connect to Ollama").yellow()
        );
        println!("You can continue, but make sure Ollama is running before searching.");
    }

    println!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        println!("{}", style("✓ Configuration saved successfully!").green());

        let config_path = Config::config_file_path().context("Failed to get config file path")?;
        println!(
            "Configuration saved to: {}",
            style(config_path.display()).cyan()
        );
    } else {
        println!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config() -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    println!("{}", style("📋 Current Configuration").bold().cyan());
    println!();

    println!("{}", style("Ollama Settings:").bold().yellow());
    println!("  Host: {}", style(&config.ollama.host).cyan());
    println!("  Port: {}", style(config.ollama.port).cyan());
    println!("  Model: {}", style(&config.ollama.model).cyan());

    match config.ollama_url() {
        Ok(url) => println!("  Ollama URL: {}", style(url).cyan()),
        Err(e) => println!("  Ollama URL: {} ({})", style("Invalid").red(), e),
    }

    println!();
    println!("{}", style("Search Settings:").bold().yellow());
    println!(
        "  Indexed vector: {}",
        style(config.search.which_vec).cyan()
    );
    println!("  Candidate pool (top_n): {}", style(config.search.top_n).cyan());
    println!("  Returned records (final_k): {}", style(config.search.final_k).cyan());
    println!(
        "  Acceptance threshold: {}",
        style(config.search.sem_thr).cyan()
    );
    println!(
        "  Query embedding cache: {}",
        style(if config.search.cache_queries {
            "enabled"
        } else {
            "disabled"
        })
        .cyan()
    );

    println!();
    match config.db_path() {
        Ok(path) => println!("Database: {}", style(path.display()).cyan()),
        Err(e) => println!("Database: {} ({})", style("Unknown").red(), e),
    }

    let config_path = Config::config_file_path().context("Failed to get config file path")?;
    println!("Config file: {}", style(config_path.display()).dim());

    Ok(())
}

fn load_existing_config() -> Result<Config> {
    Config::load().map_or_else(
        |_| {
            println!(
                "{}",
                style("No existing configuration found. Using defaults.").yellow()
            );
            Ok(Config::default())
        },
        |config| {
            println!("{}", style("Found existing configuration.").green());
            Ok(config)
        },
    )
}

fn configure_ollama(ollama: &mut OllamaConfig) -> Result<()> {
    let host: String = Input::new()
        .with_prompt("Ollama host")
        .default(ollama.host.clone())
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

    ollama.host = host;
    ollama.port = port;
    ollama.model = model;
    ollama.validate()?;

    Ok(())
}

fn configure_search(search: &mut SearchConfig) -> Result<()> {
    let which_vec: String = Input::new()
        .with_prompt("Indexed vector variant (q = question, a = answer)")
        .default(search.which_vec.to_string())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            input.parse::<VectorVariant>().map(|_| ())
        })
        .interact_text()?;

    let sem_thr: f32 = Input::new()
        .with_prompt("Acceptance similarity threshold")
        .default(search.sem_thr)
        .validate_with(|input: &f32| -> Result<(), &str> {
            if (-1.0..=1.0).contains(input) {
                Ok(())
            } else {
                Err("Threshold must be between -1.0 and 1.0")
            }
        })
        .interact_text()?;

    let final_k: usize = Input::new()
        .with_prompt("Records returned per query (final_k)")
        .default(search.final_k)
        .validate_with(|input: &usize| -> Result<(), &str> {
            if *input == 0 {
                Err("final_k must be at least 1")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    search.which_vec = which_vec.parse()?;
    search.sem_thr = sem_thr;
    search.final_k = final_k;
    if search.top_n < search.final_k {
        search.top_n = search.final_k;
    }
    search.validate()?;

    Ok(())
}

fn test_ollama_connection(ollama: &OllamaConfig) -> bool {
    let url = format!("http://{}:{}/api/version", ollama.host, ollama.port);

    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(std::time::Duration::from_secs(5)))
        .build()
        .into();

    match agent.get(&url).call() {
        Ok(_) => true,
        Err(ureq::Error::StatusCode(code)) if (400..500).contains(&code) => true,
        Err(_) => false,
    }
}
