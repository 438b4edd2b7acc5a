//! SUBMINT CLI
//!
//! Search for and mint subdomains of a parent ENS name from the terminal.

mod app;
mod interactive;
mod render;

use std::path::PathBuf;

use alloy::primitives::Address;
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use dialoguer::{Confirm, Select};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use submint_core::constants::chain_name;
use submint_core::format::{format_price, shorten_address};
use submint_core::types::{ConnectorKind, SearchResult};
use submint_ens::{label_id, labelhash, namehash};
use submint_flow::{refresh_price, run_mint, spawn_search, MintEvent, Page, SearchPhase, SearchSnapshot};

use crate::app::{App, Options};
use crate::render::{print_card, print_json, print_status, print_wallet, spinner};

/// SUBMINT - subdomain search and mint client
#[derive(Parser)]
#[command(name = "submint")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print machine-readable JSON instead of styled text
    #[arg(long, global = true)]
    json: bool,

    /// Ethereum RPC URL
    #[arg(long, global = true, env = "ETH_RPC_URL")]
    rpc_url: Option<String>,

    /// Parent domain to mint under (overrides PARENT_DOMAIN)
    #[arg(long, global = true)]
    parent_domain: Option<String>,

    /// Load configuration from this dotenv file instead of `.env`
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    /// Use an in-memory registry instead of the chain
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the label id and namehash of a name
    Hash {
        /// Domain, e.g. alice.example.eth
        name: String,
    },

    /// Check whether a subdomain is available
    Search {
        /// Label to search for
        label: String,
        /// After a persistent read error, report the name as available anyway
        #[arg(long)]
        proceed_anyway: bool,
    },

    /// Show configuration and connectivity
    Status,

    /// Show the mint price
    Price {
        /// Account to price for (the parent owner mints for free)
        #[arg(long)]
        account: Option<Address>,
    },

    /// Mint a subdomain
    Mint {
        /// Label to mint
        label: String,
        /// Wallet connector to sign with
        #[arg(short, long, value_enum, default_value = "local")]
        connector: ConnectorArg,
        /// Skip confirmation prompts
        #[arg(short, long)]
        yes: bool,
        /// Mint even if availability cannot be verified
        #[arg(long)]
        proceed_anyway: bool,
    },

    /// Interactive page (default)
    Page,
}

#[derive(Clone, Copy, ValueEnum)]
enum ConnectorArg {
    /// Local private key (PRIVATE_KEY)
    Local,
    /// Remote signer (SIGNER_URL, PAIRING_PROJECT_ID)
    Remote,
}

impl From<ConnectorArg> for ConnectorKind {
    fn from(arg: ConnectorArg) -> Self {
        match arg {
            ConnectorArg::Local => ConnectorKind::Injected,
            ConnectorArg::Remote => ConnectorKind::RemotePairing,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "submint=debug,info"
    } else {
        "submint=info,warn"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let options = Options {
        env_file: cli.env_file.as_deref(),
        rpc_url: cli.rpc_url.as_deref(),
        parent_domain: cli.parent_domain.as_deref(),
        offline: cli.offline,
    };
    let json = cli.json;

    match cli.command.unwrap_or(Commands::Page) {
        Commands::Hash { name } => cmd_hash(&name, json),
        Commands::Search {
            label,
            proceed_anyway,
        } => cmd_search(&App::build(options).await?, &label, proceed_anyway, json).await,
        Commands::Status => cmd_status(&App::build(options).await?, json).await,
        Commands::Price { account } => cmd_price(&App::build(options).await?, account, json).await,
        Commands::Mint {
            label,
            connector,
            yes,
            proceed_anyway,
        } => {
            let app = App::build(options).await?;
            cmd_mint(&app, &label, connector.into(), yes, proceed_anyway, json).await
        }
        Commands::Page => interactive::run(&App::build(options).await?).await,
    }
}

/// Print hashes of a name
fn cmd_hash(name: &str, json: bool) -> Result<()> {
    let name = name.trim().to_lowercase();
    let first = name.split('.').next().unwrap_or_default();
    let id = label_id(&name);

    if json {
        return print_json(&serde_json::json!({
            "name": name,
            "label": first,
            "labelhash": labelhash(first),
            "label_id": id.to_string(),
            "namehash": namehash(&name),
        }));
    }

    println!("{} {}", "🔢 Hashes for".cyan().bold(), name);
    println!("   {} {}", "Label:".dimmed(), first);
    println!("   {} {}", "Labelhash:".dimmed(), labelhash(first));
    println!("   {} {}", "Label id:".dimmed(), id);
    println!("   {} {}", "Namehash:".dimmed(), namehash(&name));
    Ok(())
}

/// Search for a subdomain
async fn cmd_search(app: &App, label: &str, proceed_anyway: bool, json: bool) -> Result<()> {
    let (snapshot, result) = resolve_search(app, label, proceed_anyway, json).await?;

    if json {
        return print_json(&serde_json::json!({
            "search": snapshot,
            "result": result,
        }));
    }

    println!("{} {}", "🔍 Searching:".cyan().bold(), app.config.full_domain(&snapshot.term));
    print_status(&snapshot);

    match result {
        Some(result) => {
            println!("\n   {}  {}", result.full_domain.bold(), render::badge(result.availability()));
            if !result.is_verified() {
                println!("   {}", "Availability not verified.".yellow());
            }
        }
        None if snapshot.phase == SearchPhase::Empty => {
            println!("   {}", "Nothing to search: labels use a-z, 0-9 and '-'.".yellow());
        }
        None => {}
    }
    Ok(())
}

/// Show configuration and connectivity
async fn cmd_status(app: &App, json: bool) -> Result<()> {
    let config = &app.config;
    let rpc_chain = app.rpc_chain_id().await;
    let missing = config.missing_options();

    if json {
        return print_json(&serde_json::json!({
            "parent_domain": config.parent_domain,
            "parent_id": label_id(&config.parent_domain).to_string(),
            "registry": config.registry_address,
            "parent_token": config.parent_token_address,
            "rpc_url": config.rpc_url,
            "rpc_chain_id": rpc_chain,
            "target_chain_id": config.chain_id,
            "explorer_url": config.explorer_url,
            "signer_url": config.signer_url,
            "private_key_set": config.private_key.is_some(),
            "missing": missing,
        }));
    }

    println!("{}", "📋 SUBMINT status".cyan().bold());
    println!("   {} {}", "Parent domain:".dimmed(), config.parent_domain);
    println!("   {} {}", "Registry:".dimmed(), config.registry_address);
    println!("   {} {}", "Parent token:".dimmed(), config.parent_token_address);
    println!("   {} {}", "Target chain:".dimmed(), chain_name(config.chain_id));
    match (&app.provider, rpc_chain) {
        (None, _) => println!("   {} {}", "RPC:".dimmed(), "offline".yellow()),
        (Some(_), Some(id)) if id == config.chain_id => {
            println!("   {} {} ({})", "RPC:".dimmed(), config.rpc_url, chain_name(id).green())
        }
        (Some(_), Some(id)) => {
            println!("   {} {} ({})", "RPC:".dimmed(), config.rpc_url, chain_name(id).red())
        }
        (Some(_), None) => println!("   {} {} ({})", "RPC:".dimmed(), config.rpc_url, "unreachable".red()),
    }
    println!("   {} {}", "Signer:".dimmed(), config.signer_url);
    println!(
        "   {} {}",
        "Local key:".dimmed(),
        if config.private_key.is_some() { "set".green() } else { "not set".yellow() }
    );

    if !missing.is_empty() {
        println!("\n{}", "⚠️  Missing options:".yellow().bold());
        for key in missing {
            println!("   {key}");
        }
    }
    Ok(())
}

/// Show the mint price
async fn cmd_price(app: &App, account: Option<Address>, json: bool) -> Result<()> {
    let parent_id = label_id(&app.config.parent_domain);
    let inputs = app
        .reader
        .price_inputs(parent_id)
        .await
        .context("Failed to read mint price")?;
    let price = account.map(|a| inputs.price_for(a));

    if json {
        return print_json(&serde_json::json!({
            "parent_id": parent_id.to_string(),
            "owner": inputs.owner,
            "default_price": inputs.default_price.to_string(),
            "account": account,
            "price": price.map(|p| p.to_string()),
        }));
    }

    println!("{} {}", "💰 Mint price for".cyan().bold(), app.config.parent_domain);
    println!("   {} {}", "Parent owner:".dimmed(), shorten_address(&inputs.owner));
    println!("   {} {}", "Default price:".dimmed(), format_price(inputs.default_price));
    if let (Some(account), Some(price)) = (account, price) {
        println!("   {} {} pays {}", "Price:".dimmed(), shorten_address(&account), format_price(price).green());
    }
    Ok(())
}

/// Mint a subdomain
async fn cmd_mint(
    app: &App,
    label: &str,
    connector: ConnectorKind,
    yes: bool,
    proceed_anyway: bool,
    json: bool,
) -> Result<()> {
    let (snapshot, result) = resolve_search(app, label, proceed_anyway, json).await?;
    let Some(result) = result else {
        print_status(&snapshot);
        bail!("{} cannot be minted", app.config.full_domain(&snapshot.term));
    };
    if result.exists {
        bail!("{} is already taken", result.full_domain);
    }

    app.wallet.connect(connector).await;
    if !app.wallet.session().is_connected() {
        bail!("Failed to connect the {} wallet (see log)", connector);
    }
    if !app.wallet.network().is_correct_network() {
        let label = app.wallet.network().switch_label();
        if yes || confirm(format!("{label}?"), true).await? {
            app.wallet.switch_network().await;
        }
        if !app.wallet.network().is_correct_network() {
            bail!("Wallet is not on {}", chain_name(app.config.chain_id));
        }
    }
    if !json {
        print_wallet(&app.wallet.view());
    }

    let mut page = Page::new(app.config.clone());
    page.show_result(result);

    let Some(event) = mint_active(app, &mut page, yes, json).await? else {
        return Ok(());
    };

    if json {
        let tx = match &event {
            MintEvent::Success(tx) => Some(*tx),
            MintEvent::Failed(_) => page.mint().last_tx(),
        };
        return print_json(&serde_json::json!({
            "success": matches!(event, MintEvent::Success(_)),
            "tx": tx,
            "explorer_url": tx.and_then(|tx| page.explorer_link(&tx)),
            "error": match &event { MintEvent::Failed(message) => Some(message.clone()), _ => None },
        }));
    }

    match event {
        MintEvent::Success(_) => Ok(()),
        MintEvent::Failed(message) => bail!(message),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SHARED STEPS
// ═══════════════════════════════════════════════════════════════════════════════

/// Runs the search flow for `label` and presses the search button if enabled.
async fn resolve_search(
    app: &App,
    label: &str,
    proceed_anyway: bool,
    quiet: bool,
) -> Result<(SearchSnapshot, Option<SearchResult>)> {
    let (search, _task) = spawn_search(app.reader.clone(), app.config.parent_domain.clone());

    let pb = (!quiet).then(|| spinner("Checking domain availability...")).transpose()?;
    let mut snapshot = search.search(label).await?;

    if proceed_anyway && snapshot.phase == SearchPhase::QueryError {
        if let Some(pb) = &pb {
            pb.set_message("Waiting to enable mint option...");
        }
        snapshot = search.wait_for(|s| s.can_proceed).await?;
    }
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    let result = if snapshot.can_submit { search.submit().await? } else { None };
    Ok((snapshot, result))
}

/// Resolves the price, confirms and runs one mint of the page's active result.
pub(crate) async fn mint_active(app: &App, page: &mut Page, yes: bool, quiet: bool) -> Result<Option<MintEvent>> {
    page.session_changed(&app.wallet.session());

    let Some(connection) = app.wallet.connection() else {
        println!("   {}", "Connect your wallet to mint this domain".cyan());
        return Ok(None);
    };
    let Some(full_domain) = page.active_result().map(|r| r.full_domain.clone()) else {
        println!("   {}", "Search for a name first.".yellow());
        return Ok(None);
    };

    refresh_price(page.mint_mut(), app.reader.as_ref()).await;
    if let Some(error) = page.mint().price_error() {
        println!("   {} {}", "Mint price unavailable:".red(), error);
        return Ok(None);
    }
    if !page.mint().can_submit() {
        println!("   {}", "Minting is not available right now.".yellow());
        return Ok(None);
    }

    let price = page.mint().price().unwrap_or_default();
    if !yes && !confirm(format!("Mint {} for {}?", full_domain, format_price(price)), true).await? {
        return Ok(None);
    }

    let pb = (!quiet).then(|| spinner("Waiting for transaction...")).transpose()?;
    let mut announced = false;
    let event = run_mint(page.mint_mut(), connection.writer.as_ref(), |mint| {
        let Some(pb) = &pb else { return };
        pb.set_message(mint.button_label());
        if let (Some(tx), false) = (mint.last_tx(), announced) {
            announced = true;
            pb.println(format!("   {} {}", "Transaction submitted".blue(), tx));
            if let Some(url) = app.config.explorer_tx_url(&tx) {
                pb.println(format!("   {} {}", "View on Etherscan:".dimmed(), url));
            }
        }
    })
    .await?;
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    if !quiet {
        match &event {
            MintEvent::Success(_) => println!("{} {}", "✅ Transaction confirmed!".green().bold(), full_domain),
            MintEvent::Failed(_) => {
                if let Some(message) = page.mint().error_message() {
                    println!("{} {}", "❌".red(), message.red());
                }
            }
        }
    }
    page.handle_mint_event(&event);

    Ok(Some(event))
}

/// Asks a yes/no question without blocking the runtime.
async fn confirm(prompt: String, default: bool) -> Result<bool> {
    let answer = tokio::task::spawn_blocking(move || {
        Confirm::new().with_prompt(prompt).default(default).interact()
    })
    .await??;
    Ok(answer)
}

/// Lets the user pick a connector from the wallet menu.
pub(crate) async fn choose_connector(menu: Vec<ConnectorKind>) -> Result<Option<ConnectorKind>> {
    let items: Vec<&'static str> = menu.iter().map(|k| k.label()).collect();
    let choice = tokio::task::spawn_blocking(move || {
        Select::new()
            .with_prompt("Connect Wallet")
            .items(&items)
            .default(0)
            .interact_opt()
    })
    .await??;
    Ok(choice.map(|idx| menu[idx]))
}
