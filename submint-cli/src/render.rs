//! Terminal rendering.

use std::time::Duration;

use anyhow::Result;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use submint_core::types::Availability;
use submint_flow::{CardAction, PrimaryAction, ResultCard, SearchSnapshot, SearchStatus, WalletView};

pub fn spinner(message: impl Into<String>) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    pb.set_message(message.into());
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn badge(availability: Availability) -> ColoredString {
    match availability {
        Availability::Available => availability.label().green().bold(),
        Availability::Taken => availability.label().red().bold(),
    }
}

pub fn print_status(snapshot: &SearchSnapshot) {
    let Some(status) = &snapshot.status else {
        return;
    };

    let line = status.to_string();
    match status {
        SearchStatus::Taken => println!("   {}", line.red()),
        SearchStatus::Checking => println!("   {}", line.dimmed()),
        SearchStatus::Error(_) | SearchStatus::Unverifiable => println!("   {}", line.yellow()),
    }
    if snapshot.can_proceed {
        println!("   {}", "Use :proceed to mint anyway, or :clear to cancel.".dimmed());
    }
}

pub fn print_card(card: &ResultCard) {
    println!();
    println!("   {}  {}", card.full_domain.bold(), badge(card.badge));

    match &card.action {
        CardAction::Nothing => {}
        CardAction::ConnectPrompt { message } => println!("   {}", message.cyan()),
        CardAction::SwitchNetwork { label } => {
            println!("   {} {}", "⚠️ ".yellow(), format!("{label} (:switch)").yellow())
        }
        CardAction::Mint {
            label,
            enabled,
            spinner,
        } => {
            let price = card.price.as_deref().unwrap_or("price unknown");
            let text = format!("[ {label} ]  {price}");
            match (enabled, spinner) {
                (_, true) => println!("   {}", text.cyan()),
                (true, false) => println!("   {}  {}", text.green().bold(), ":mint".dimmed()),
                (false, false) => println!("   {}", text.dimmed()),
            }
        }
    }

    if let Some(banner) = &card.banner {
        println!("   {}", banner.blue());
    }
    if let Some(url) = &card.explorer_url {
        println!("   {} {}", "View on Etherscan:".dimmed(), url);
    }
    if let Some(error) = &card.error {
        println!("   {}", error.red());
    }
}

pub fn print_wallet(view: &WalletView) {
    let text = match (&view.action, &view.display) {
        (PrimaryAction::Disconnect, Some(display)) => {
            let avatar = match &view.avatar {
                Some(url) => format!("🖼  {url}"),
                None => "▢".cyan().to_string(),
            };
            format!("{avatar} {}  ×", display.green())
        }
        (PrimaryAction::SwitchNetwork(label), _) => label.yellow().to_string(),
        _ if view.connecting => "Connecting...".dimmed().to_string(),
        _ => view.action.label().cyan().to_string(),
    };
    println!("{} {}", "👛".dimmed(), text);
}
