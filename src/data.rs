use std::{fmt, ops::Deref, sync::Arc};

use crate::action::OutboundAction;
use crate::assistant::{self, Completion};
use crate::config::BotConfig;
use crate::discord::DiscordMessenger;
use crate::dispatcher::{Dispatcher, InboundEvent};
use crate::maintenance::{MaintenanceHandle, MaintenanceService};
use crate::messenger::Messenger;
use poise::serenity_prelude::Http;
use tracing::info;

/// State shared by every command and event handler
pub struct DataInner {
    pub config: BotConfig,
    pub dispatcher: Dispatcher,
    /// Requests to the maintenance task
    pub maintenance: MaintenanceHandle,
}

#[derive(Clone)]
pub struct Data(pub Arc<DataInner>);

impl Deref for Data {
    type Target = DataInner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Debug for Data {
    // The config holds secrets, so only the harmless parts are shown
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Data")
            .field("command_prefix", &self.config.command_prefix)
            .field("dispatch", &self.config.dispatch)
            .field("maintenance", &self.maintenance)
            .finish_non_exhaustive()
    }
}

impl Data {
    /// Build the engines and start the maintenance task.
    ///
    /// Must be called inside a tokio runtime.
    pub fn new(
        config: BotConfig,
        messenger: Arc<dyn Messenger>,
        completion: Arc<dyn Completion>,
    ) -> Self {
        let dispatcher = Dispatcher::new(messenger, completion, &config);
        let (maintenance, _task) = MaintenanceService::for_dispatcher(&dispatcher, config.game_ttl())
            .start(config.sweep_interval());

        info!(
            prefix = %config.command_prefix,
            denial = ?config.dispatch.denial,
            require_authorization = config.dispatch.require_authorization,
            "Bot data initialized"
        );

        Self(Arc::new(DataInner {
            config,
            dispatcher,
            maintenance,
        }))
    }

    /// Data wired to Discord and to the assistant backend from the config
    pub fn for_discord(config: BotConfig, http: Arc<Http>) -> Self {
        let completion = assistant::backend(config.gemini_api_key.as_deref());
        Self::new(config, Arc::new(DiscordMessenger::new(http)), completion)
    }

    pub async fn handle(&self, event: InboundEvent) -> Vec<OutboundAction> {
        self.dispatcher.handle(event).await
    }

    /// Stop the maintenance task
    pub async fn shutdown(&self) {
        if self.maintenance.shutdown().await.is_ok() {
            info!("Maintenance shutdown requested");
        }
    }
}
