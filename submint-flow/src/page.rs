//! Page composition: the active search result and its mint card.

use alloy::primitives::TxHash;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use submint_core::config::AppConfig;
use submint_core::format::format_price;
use submint_core::types::{Availability, SearchResult, WalletSession};
use submint_ens::label_id;

use crate::mint::{MintEvent, MintFlow};
use crate::network::NetworkStatus;

/// What the result card offers below the badge.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CardAction {
    /// The name is taken; nothing to do.
    Nothing,
    /// No wallet connected.
    ConnectPrompt {
        /// Prompt text
        message: String,
    },
    /// Connected on the wrong chain.
    SwitchNetwork {
        /// Button text
        label: String,
    },
    /// Mint button.
    Mint {
        /// Button text
        label: String,
        /// Whether the button is enabled
        enabled: bool,
        /// Whether a spinner is shown
        spinner: bool,
    },
}

/// Rendered result card.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultCard {
    /// Searched domain
    pub full_domain: String,
    /// Taken / Available badge
    pub badge: Availability,
    /// Action area
    pub action: CardAction,
    /// Price the connected account pays, formatted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    /// Transaction status banner
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banner: Option<String>,
    /// Explorer link of the submitted transaction
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explorer_url: Option<String>,
    /// Error box
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The page around the search box.
#[derive(Clone, Debug)]
pub struct Page {
    config: AppConfig,
    mint: MintFlow,
    last_minted: Option<TxHash>,
}

impl Page {
    /// Builds the page for the configured parent domain and chain.
    pub fn new(config: AppConfig) -> Self {
        let mint = MintFlow::new(label_id(&config.parent_domain), config.chain_id);
        Self {
            config,
            mint,
            last_minted: None,
        }
    }

    /// Makes `result` the active result.
    pub fn show_result(&mut self, result: SearchResult) {
        info!(full_domain = %result.full_domain, exists = result.exists, "Searching for domain");
        self.mint.set_target(Some(result));
    }

    /// Drops the active result.
    pub fn clear_result(&mut self) {
        self.mint.set_target(None);
    }

    /// Active result, if any.
    pub fn active_result(&self) -> Option<&SearchResult> {
        self.mint.target()
    }

    /// Forwards a wallet session change to the mint flow.
    pub fn session_changed(&mut self, session: &WalletSession) {
        self.mint.session_changed(session);
    }

    /// Mint flow of the active result.
    pub fn mint(&self) -> &MintFlow {
        &self.mint
    }

    /// Mutable mint flow, for the runtime to drive.
    pub fn mint_mut(&mut self) -> &mut MintFlow {
        &mut self.mint
    }

    /// Reacts to the end of a mint attempt. A success clears the result.
    pub fn handle_mint_event(&mut self, event: &MintEvent) {
        match event {
            MintEvent::Success(tx) => {
                info!(%tx, "Mint successful");
                self.last_minted = Some(*tx);
                self.clear_result();
            }
            MintEvent::Failed(message) => error!(error = %message, "Mint failed"),
        }
    }

    /// Transaction of the most recent successful mint.
    pub fn last_minted(&self) -> Option<TxHash> {
        self.last_minted
    }

    /// Explorer link for `tx`.
    pub fn explorer_link(&self, tx: &TxHash) -> Option<String> {
        self.config.explorer_tx_url(tx)
    }

    /// Renders the card for the active result.
    pub fn card(&self, session: &WalletSession) -> Option<ResultCard> {
        let result = self.mint.target()?;
        let network = NetworkStatus::new(self.config.chain_id, session);

        let action = if result.exists {
            CardAction::Nothing
        } else if !session.is_connected() {
            CardAction::ConnectPrompt {
                message: "Connect your wallet to mint this domain".into(),
            }
        } else if !network.is_correct_network() {
            CardAction::SwitchNetwork {
                label: network.switch_label(),
            }
        } else {
            CardAction::Mint {
                label: self.mint.button_label().into(),
                enabled: self.mint.can_submit(),
                spinner: self.mint.shows_spinner(),
            }
        };

        Some(ResultCard {
            full_domain: result.full_domain.clone(),
            badge: result.availability(),
            action,
            price: self.mint.price().map(format_price),
            banner: self.mint.tx_banner().map(String::from),
            explorer_url: self.mint.last_tx().and_then(|tx| self.explorer_link(&tx)),
            error: self.mint.error_message(),
        })
    }
}
