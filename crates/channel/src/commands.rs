use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

use warung_core::commands::{parse_buy_args, parse_order_id, BuyArgs, Command, ParsedCommand};

use crate::actor::ActorContext;
use crate::replies;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CommandRouteError {
    #[error("command service failed: {0}")]
    Service(String),
}

/// Storefront operations reachable from keyword commands.
#[async_trait]
pub trait StorefrontCommands: Send + Sync {
    async fn catalog(
        &self,
        category: Option<String>,
        actor: &ActorContext,
    ) -> Result<String, CommandRouteError>;
    async fn categories(&self, actor: &ActorContext) -> Result<String, CommandRouteError>;
    async fn product_detail(
        &self,
        sku: String,
        actor: &ActorContext,
    ) -> Result<String, CommandRouteError>;
    async fn search(&self, query: String, actor: &ActorContext)
        -> Result<String, CommandRouteError>;
    async fn add_to_cart(
        &self,
        args: BuyArgs,
        actor: &ActorContext,
    ) -> Result<String, CommandRouteError>;
    async fn view_cart(&self, actor: &ActorContext) -> Result<String, CommandRouteError>;
    /// Drops the line at `position`, or only `quantity` units of it.
    async fn remove_from_cart(
        &self,
        position: String,
        quantity: Option<u32>,
        actor: &ActorContext,
    ) -> Result<String, CommandRouteError>;
    async fn clear_cart(&self, actor: &ActorContext) -> Result<String, CommandRouteError>;
    async fn start_checkout(&self, actor: &ActorContext) -> Result<String, CommandRouteError>;
    async fn track_order(
        &self,
        order_id: String,
        actor: &ActorContext,
    ) -> Result<String, CommandRouteError>;
    async fn order_history(&self, actor: &ActorContext) -> Result<String, CommandRouteError>;
    async fn store_info(&self, actor: &ActorContext) -> Result<String, CommandRouteError>;
}

pub struct CommandRouter<S> {
    service: Arc<S>,
}

impl<S> CommandRouter<S>
where
    S: StorefrontCommands,
{
    pub fn new(service: Arc<S>) -> Self {
        Self { service }
    }

    pub async fn route(
        &self,
        parsed: &ParsedCommand,
        raw_text: &str,
        actor: &ActorContext,
    ) -> Result<String, CommandRouteError> {
        let first_arg = parsed.args.first().map(|arg| arg.trim().to_owned());

        match parsed.command {
            Command::Catalog => self.service.catalog(None, actor).await,
            Command::Categories if !parsed.args.is_empty() => {
                self.service.catalog(Some(parsed.arg_text()), actor).await
            }
            Command::Categories => self.service.categories(actor).await,
            Command::ProductDetail => match first_arg {
                Some(sku) => self.service.product_detail(sku.to_ascii_uppercase(), actor).await,
                None => Ok(usage(Command::ProductDetail)),
            },
            Command::Search if parsed.args.is_empty() => Ok(usage(Command::Search)),
            Command::Search => self.service.search(parsed.arg_text(), actor).await,
            Command::AddToCart => match parse_buy_args(&parsed.args) {
                Some(args) => self.service.add_to_cart(args, actor).await,
                None => Ok(usage(Command::AddToCart)),
            },
            Command::ViewCart => self.service.view_cart(actor).await,
            Command::RemoveFromCart => {
                let quantity = parsed
                    .args
                    .get(1)
                    .and_then(|raw| raw.trim().parse::<u32>().ok())
                    .filter(|quantity| *quantity > 0);
                match first_arg {
                    Some(position) => {
                        self.service.remove_from_cart(position, quantity, actor).await
                    }
                    None => Ok(usage(Command::RemoveFromCart)),
                }
            }
            Command::ClearCart => self.service.clear_cart(actor).await,
            Command::Checkout => self.service.start_checkout(actor).await,
            Command::TrackOrder => {
                let order_id = first_arg
                    .map(|arg| arg.to_ascii_uppercase())
                    .or_else(|| parse_order_id(raw_text));
                match order_id {
                    Some(order_id) => self.service.track_order(order_id, actor).await,
                    None => Ok(usage(Command::TrackOrder)),
                }
            }
            Command::OrderHistory => self.service.order_history(actor).await,
            Command::Help => Ok(replies::help_menu()),
            Command::StoreInfo => self.service.store_info(actor).await,
        }
    }

    /// Like [`Self::route`], but failures become the command's apology text.
    pub async fn respond(
        &self,
        parsed: &ParsedCommand,
        raw_text: &str,
        actor: &ActorContext,
    ) -> String {
        match self.route(parsed, raw_text, actor).await {
            Ok(reply) => reply,
            Err(error) => {
                warn!(
                    correlation_id = %actor.correlation_id,
                    customer_id = %actor.customer_id,
                    command = ?parsed.command,
                    error = %error,
                    "command handler failed"
                );
                replies::command_failure(parsed.command)
            }
        }
    }
}

fn usage(command: Command) -> String {
    replies::usage(command).unwrap_or_else(replies::help_menu)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use warung_core::commands::{parse_command, BuyArgs};
    use warung_core::domain::admin::AdminAccess;

    use super::{CommandRouteError, CommandRouter, StorefrontCommands};
    use crate::actor::ActorContext;

    #[derive(Default)]
    struct RecordingService {
        calls: Mutex<Vec<String>>,
    }

    impl RecordingService {
        async fn record(&self, call: String) -> Result<String, CommandRouteError> {
            self.calls.lock().await.push(call.clone());
            Ok(call)
        }
    }

    #[async_trait]
    impl StorefrontCommands for RecordingService {
        async fn catalog(
            &self,
            category: Option<String>,
            _actor: &ActorContext,
        ) -> Result<String, CommandRouteError> {
            self.record(format!("catalog:{}", category.unwrap_or_default())).await
        }

        async fn categories(&self, _actor: &ActorContext) -> Result<String, CommandRouteError> {
            self.record("categories".to_owned()).await
        }

        async fn product_detail(
            &self,
            sku: String,
            _actor: &ActorContext,
        ) -> Result<String, CommandRouteError> {
            self.record(format!("detail:{sku}")).await
        }

        async fn search(
            &self,
            query: String,
            _actor: &ActorContext,
        ) -> Result<String, CommandRouteError> {
            self.record(format!("search:{query}")).await
        }

        async fn add_to_cart(
            &self,
            args: BuyArgs,
            _actor: &ActorContext,
        ) -> Result<String, CommandRouteError> {
            self.record(format!("buy:{}x{}", args.sku, args.quantity)).await
        }

        async fn view_cart(&self, _actor: &ActorContext) -> Result<String, CommandRouteError> {
            self.record("cart".to_owned()).await
        }

        async fn remove_from_cart(
            &self,
            position: String,
            quantity: Option<u32>,
            _actor: &ActorContext,
        ) -> Result<String, CommandRouteError> {
            match quantity {
                Some(quantity) => self.record(format!("remove:{position}x{quantity}")).await,
                None => self.record(format!("remove:{position}")).await,
            }
        }

        async fn clear_cart(&self, _actor: &ActorContext) -> Result<String, CommandRouteError> {
            Err(CommandRouteError::Service("cart store offline".to_owned()))
        }

        async fn start_checkout(&self, _actor: &ActorContext) -> Result<String, CommandRouteError> {
            self.record("checkout".to_owned()).await
        }

        async fn track_order(
            &self,
            order_id: String,
            _actor: &ActorContext,
        ) -> Result<String, CommandRouteError> {
            self.record(format!("track:{order_id}")).await
        }

        async fn order_history(&self, _actor: &ActorContext) -> Result<String, CommandRouteError> {
            self.record("history".to_owned()).await
        }

        async fn store_info(&self, _actor: &ActorContext) -> Result<String, CommandRouteError> {
            self.record("info".to_owned()).await
        }
    }

    fn actor() -> ActorContext {
        ActorContext::new("628111@c.us", "msg-1", AdminAccess::user())
    }

    async fn reply(router: &CommandRouter<RecordingService>, text: &str) -> String {
        let parsed = parse_command(text).expect("text should parse as a command");
        router.respond(&parsed, text, &actor()).await
    }

    #[tokio::test]
    async fn routes_commands_to_service_entrypoints() {
        let router = CommandRouter::new(Arc::new(RecordingService::default()));

        assert_eq!(reply(&router, "katalog").await, "catalog:");
        assert_eq!(reply(&router, "KATEGORI oli mesin").await, "catalog:oli mesin");
        assert_eq!(reply(&router, "kategori").await, "categories");
        assert_eq!(reply(&router, "produk fas101").await, "detail:FAS101");
        assert_eq!(reply(&router, "CARI kaos polos").await, "search:kaos polos");
        assert_eq!(reply(&router, "beli fas101 3").await, "buy:FAS101x3");
        assert_eq!(reply(&router, "BELI FAS101").await, "buy:FAS101x1");
        assert_eq!(reply(&router, "HAPUS 2").await, "remove:2");
        assert_eq!(reply(&router, "HAPUS 2 3").await, "remove:2x3");
        assert_eq!(reply(&router, "HAPUS 2 nol").await, "remove:2");
        assert_eq!(reply(&router, "cek ord-abc123").await, "track:ORD-ABC123");
        assert_eq!(reply(&router, "riwayat").await, "history");
        assert_eq!(reply(&router, "INFO").await, "info");
    }

    #[tokio::test]
    async fn missing_arguments_get_usage_hints() {
        let router = CommandRouter::new(Arc::new(RecordingService::default()));

        assert!(reply(&router, "PRODUK").await.contains("PRODUK <kode>"));
        assert!(reply(&router, "CARI").await.contains("CARI <kata kunci>"));
        assert!(reply(&router, "BELI").await.contains("BELI <kode> <jumlah>"));
        assert!(reply(&router, "HAPUS").await.contains("HAPUS <nomor>"));
        assert!(reply(&router, "CEK").await.contains("CEK <order-id>"));
        assert!(router.service.calls.lock().await.is_empty());
    }

    #[tokio::test]
    async fn help_is_answered_without_the_service() {
        let router = CommandRouter::new(Arc::new(RecordingService::default()));

        assert!(reply(&router, "help").await.starts_with("🤖 *Menu Bot E-Commerce*"));
        assert!(router.service.calls.lock().await.is_empty());
    }

    #[tokio::test]
    async fn service_failure_becomes_command_specific_apology() {
        let router = CommandRouter::new(Arc::new(RecordingService::default()));

        assert_eq!(
            reply(&router, "KOSONGKAN").await,
            "❌ Maaf, terjadi kesalahan saat mengosongkan keranjang."
        );
    }
}
