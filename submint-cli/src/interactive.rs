//! Interactive page: a prompt that plays the search box, with `:` commands
//! for the buttons around it.

use anyhow::Result;
use colored::*;
use dialoguer::Input;

use submint_flow::{refresh_price, spawn_search, Page, SearchHandle, SearchPhase, SearchSnapshot};

use crate::app::App;
use crate::render::{print_card, print_status, print_wallet, spinner};
use crate::{choose_connector, mint_active};

const HELP: &[(&str, &str)] = &[
    ("<label>", "search for <label>.<parent>"),
    (":connect", "connect a wallet"),
    (":disconnect", "disconnect the wallet"),
    (":switch", "switch the wallet to the target network"),
    (":mint", "mint the shown name"),
    (":proceed", "continue although availability could not be verified"),
    (":clear", "clear the search"),
    (":help", "show this help"),
    (":quit", "exit"),
];

enum Step {
    Continue,
    Quit,
}

/// Runs the page until `:quit` or end of input.
pub async fn run(app: &App) -> Result<()> {
    let (search, _task) = spawn_search(app.reader.clone(), app.config.parent_domain.clone());
    let mut page = Page::new(app.config.clone());

    println!("{} {}", "🌐 SUBMINT".cyan().bold(), format!("*.{}", app.config.parent_domain).bold());
    println!("   {}", "Type a name to search, :help for commands.".dimmed());
    print_wallet(&app.wallet.view());

    loop {
        let Some(line) = read_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let step = match line {
            ":quit" | ":q" | ":exit" => Step::Quit,
            ":help" | ":h" => {
                for (command, text) in HELP {
                    println!("   {:<14} {}", command.cyan(), text.dimmed());
                }
                Step::Continue
            }
            ":connect" => {
                if let Some(kind) = choose_connector(app.wallet.menu()).await? {
                    app.wallet.connect(kind).await;
                }
                wallet_changed(app, &mut page).await
            }
            ":disconnect" => {
                app.wallet.disconnect().await;
                wallet_changed(app, &mut page).await
            }
            ":switch" => {
                app.wallet.switch_network().await;
                wallet_changed(app, &mut page).await
            }
            ":mint" => {
                mint_active(app, &mut page, false, false).await?;
                show_card(app, &page);
                Step::Continue
            }
            ":proceed" => {
                match search.proceed_anyway().await? {
                    Some(result) => {
                        page.show_result(result);
                        result_changed(app, &mut page).await
                    }
                    None => {
                        println!("   {}", "Nothing to proceed with.".yellow());
                        Step::Continue
                    }
                }
            }
            ":clear" => {
                search.clear().await?;
                page.clear_result();
                Step::Continue
            }
            other if other.starts_with(':') => {
                println!("   {} {}", "Unknown command:".yellow(), other);
                Step::Continue
            }
            term => search_term(app, &search, &mut page, term).await?,
        };

        if let Step::Quit = step {
            break;
        }
    }

    Ok(())
}

async fn read_line() -> Result<Option<String>> {
    let line = tokio::task::spawn_blocking(|| {
        Input::<String>::new()
            .with_prompt("search")
            .allow_empty(true)
            .interact_text()
    })
    .await?;

    match line {
        Ok(line) => Ok(Some(line)),
        // Closed stdin ends the session.
        Err(dialoguer::Error::IO(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn search_term(app: &App, search: &SearchHandle, page: &mut Page, raw: &str) -> Result<Step> {
    let pb = spinner("Checking domain availability...")?;
    let snapshot: SearchSnapshot = search.search(raw).await?;
    pb.finish_and_clear();

    print_status(&snapshot);
    if snapshot.phase == SearchPhase::Empty {
        println!("   {}", "Labels use a-z, 0-9 and '-'.".yellow());
        return Ok(Step::Continue);
    }

    if let Some(result) = search.submit().await? {
        page.show_result(result);
        return Ok(result_changed(app, page).await);
    }
    Ok(Step::Continue)
}

async fn wallet_changed(app: &App, page: &mut Page) -> Step {
    print_wallet(&app.wallet.view());
    result_changed(app, page).await
}

async fn result_changed(app: &App, page: &mut Page) -> Step {
    page.session_changed(&app.wallet.session());
    if app.wallet.session().is_connected() && page.active_result().is_some_and(|r| !r.exists) {
        refresh_price(page.mint_mut(), app.reader.as_ref()).await;
    }
    show_card(app, page);
    Step::Continue
}

fn show_card(app: &App, page: &Page) {
    if let Some(card) = page.card(&app.wallet.session()) {
        print_card(&card);
    } else if let Some(tx) = page.last_minted() {
        if let Some(url) = page.explorer_link(&tx) {
            println!("   {} {}", "Last mint:".dimmed(), url);
        }
    }
}
