use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use warung_core::audit::AuditSink;
use warung_core::commands::BuyArgs;
use warung_core::domain::admin::AdminPermission;
use warung_core::domain::cart::Cart;
use warung_core::domain::catalog::Catalog;
use warung_core::domain::customer::Customer;
use warung_core::domain::order::{OrderId, OrderStatistics};
use warung_core::domain::product::{generate_sku, Product, ProductDraft, ProductId, ProductPatch};
use warung_core::flows::{
    FlowAction, FlowContext, FlowEngine, FlowTransitionError, FlowType, Session, SessionState,
    TransitionOutcome,
};
use warung_db::repositories::{
    CartRepository, CustomerRepository, InMemoryCartRepository, InMemoryCustomerRepository,
    InMemoryOrderRepository, InMemoryProductRepository, OrderRepository, ProductRepository,
    RepositoryError, SqlCartRepository, SqlCustomerRepository, SqlOrderRepository,
    SqlProductRepository,
};
use warung_db::DbPool;

use crate::actor::ActorContext;
use crate::checkout::{CheckoutError, CheckoutService};
use crate::commands::{CommandRouteError, StorefrontCommands};
use crate::replies;
use crate::session::{ActionError, FlowActionExecutor, SessionStore};

const OVERVIEW_ORDERS: usize = 5;

/// The four stores the storefront reads and writes.
#[derive(Clone)]
pub struct StoreRepositories {
    pub products: Arc<dyn ProductRepository>,
    pub carts: Arc<dyn CartRepository>,
    pub orders: Arc<dyn OrderRepository>,
    pub customers: Arc<dyn CustomerRepository>,
}

impl StoreRepositories {
    pub fn sql(pool: DbPool) -> Self {
        Self {
            products: Arc::new(SqlProductRepository::new(pool.clone())),
            carts: Arc::new(SqlCartRepository::new(pool.clone())),
            orders: Arc::new(SqlOrderRepository::new(pool.clone())),
            customers: Arc::new(SqlCustomerRepository::new(pool)),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            products: Arc::new(InMemoryProductRepository::default()),
            carts: Arc::new(InMemoryCartRepository::default()),
            orders: Arc::new(InMemoryOrderRepository::default()),
            customers: Arc::new(InMemoryCustomerRepository::default()),
        }
    }
}

fn route_error(error: RepositoryError) -> CommandRouteError {
    CommandRouteError::Service(error.to_string())
}

fn action_error(error: RepositoryError) -> ActionError {
    ActionError::Persistence(error.to_string())
}

/// Shop behavior behind both keyword commands and flow actions.
pub struct Storefront {
    repos: StoreRepositories,
    sessions: Arc<SessionStore>,
    engine: FlowEngine,
    checkout: CheckoutService,
    store_name: String,
}

impl Storefront {
    pub fn new(
        repos: StoreRepositories,
        sessions: Arc<SessionStore>,
        store_name: impl Into<String>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            checkout: CheckoutService::new(repos.clone(), audit),
            repos,
            sessions,
            engine: FlowEngine::new(),
            store_name: store_name.into(),
        }
    }

    pub fn repositories(&self) -> &StoreRepositories {
        &self.repos
    }

    pub fn store_name(&self) -> &str {
        &self.store_name
    }

    /// Loads or creates the sender's profile and stamps the interaction time.
    pub async fn touch_customer(&self, actor: &ActorContext) -> Result<Customer, RepositoryError> {
        let mut customer = self
            .repos
            .customers
            .find_by_id(&actor.customer_id)
            .await?
            .unwrap_or_else(|| Customer::new(actor.customer_id.clone()));
        customer.touch();
        self.repos.customers.save(customer.clone()).await?;
        Ok(customer)
    }

    async fn catalog_view(&self) -> Result<Catalog, RepositoryError> {
        Ok(Catalog::new(self.repos.products.list().await?))
    }

    async fn cart_for(&self, actor: &ActorContext) -> Result<Cart, RepositoryError> {
        Ok(self
            .repos
            .carts
            .find(&actor.customer_id)
            .await?
            .unwrap_or_else(|| Cart::new(actor.customer_id.clone())))
    }

    async fn product_list_footer(&self, reply: String) -> Result<String, ActionError> {
        let products = self.repos.products.list().await.map_err(action_error)?;
        Ok(format!("{reply}\n\n{}", replies::product_list(&products)))
    }

    async fn create_product(&self, draft: &ProductDraft) -> Result<String, ActionError> {
        let sku = generate_sku(&draft.category);
        let product = Product::from_draft(ProductId::generate(), sku, draft.clone());
        if let Err(error) = product.validate() {
            return Ok(replies::admin_action_failed(&error.to_string()));
        }

        self.repos.products.save(product.clone()).await.map_err(action_error)?;
        info!(
            event_name = "catalog.product_created",
            product_id = %product.id,
            sku = %product.sku,
            "product added from admin panel"
        );
        self.product_list_footer(replies::product_created(&product.id, &product.sku, draft)).await
    }

    async fn update_product(
        &self,
        product_id: &ProductId,
        patch: &ProductPatch,
    ) -> Result<String, ActionError> {
        let Some(mut product) =
            self.repos.products.find_by_id(product_id).await.map_err(action_error)?
        else {
            return Ok(replies::admin_action_failed("produk tidak ditemukan"));
        };

        product.apply_patch(patch);
        if let Err(error) = product.validate() {
            return Ok(replies::admin_action_failed(&error.to_string()));
        }

        self.repos.products.save(product.clone()).await.map_err(action_error)?;
        info!(
            event_name = "catalog.product_updated",
            product_id = %product.id,
            "product updated from admin panel"
        );
        self.product_list_footer(replies::product_updated(&product, &patch.changes())).await
    }

    async fn delete_product(&self, product_id: &ProductId) -> Result<String, ActionError> {
        let Some(product) =
            self.repos.products.find_by_id(product_id).await.map_err(action_error)?
        else {
            return Ok(replies::admin_action_failed("produk tidak ditemukan"));
        };

        self.repos.products.delete(product_id).await.map_err(action_error)?;
        info!(
            event_name = "catalog.product_deleted",
            product_id = %product.id,
            "product deleted from admin panel"
        );
        self.product_list_footer(replies::product_deleted(&product)).await
    }

    async fn place_order(
        &self,
        actor: &ActorContext,
        name: &str,
        address: &str,
    ) -> Result<String, ActionError> {
        match self.checkout.checkout(actor, name, address).await {
            Ok(order) => Ok(replies::order_placed(&order)),
            Err(CheckoutError::EmptyCart) => Ok(replies::empty_cart()),
            Err(CheckoutError::ProductUnavailable { name, available, .. }) => {
                Ok(replies::stock_shortage(&name, available))
            }
            Err(CheckoutError::Incomplete { order, reason }) => {
                warn!(
                    correlation_id = %actor.correlation_id,
                    order_id = %order.id,
                    reason,
                    "order stored with incomplete follow-up"
                );
                Ok(replies::order_placed_with_warning(&order))
            }
            Err(error) => {
                warn!(
                    correlation_id = %actor.correlation_id,
                    customer_id = %actor.customer_id,
                    error = %error,
                    "checkout failed"
                );
                Ok(replies::checkout_failed())
            }
        }
    }
}

#[async_trait]
impl StorefrontCommands for Storefront {
    async fn catalog(
        &self,
        category: Option<String>,
        _actor: &ActorContext,
    ) -> Result<String, CommandRouteError> {
        let catalog = self.catalog_view().await.map_err(route_error)?;
        Ok(match category {
            Some(category) => {
                let category = category.trim().to_owned();
                replies::catalog(&catalog.in_category(&category), Some(&category))
            }
            None => replies::catalog(&catalog.available(), None),
        })
    }

    async fn categories(&self, _actor: &ActorContext) -> Result<String, CommandRouteError> {
        let catalog = self.catalog_view().await.map_err(route_error)?;
        Ok(replies::categories(&catalog.categories()))
    }

    async fn product_detail(
        &self,
        sku: String,
        _actor: &ActorContext,
    ) -> Result<String, CommandRouteError> {
        Ok(match self.repos.products.find_by_sku(&sku).await.map_err(route_error)? {
            Some(product) => replies::product_detail(&product),
            None => replies::product_not_found(&sku),
        })
    }

    async fn search(
        &self,
        query: String,
        _actor: &ActorContext,
    ) -> Result<String, CommandRouteError> {
        let catalog = self.catalog_view().await.map_err(route_error)?;
        let query = query.trim();
        Ok(replies::search_results(query, &catalog.search(query)))
    }

    async fn add_to_cart(
        &self,
        args: BuyArgs,
        actor: &ActorContext,
    ) -> Result<String, CommandRouteError> {
        let Some(product) = self.repos.products.find_by_sku(&args.sku).await.map_err(route_error)?
        else {
            return Ok(replies::unknown_product(&args.sku));
        };

        let mut cart = self.cart_for(actor).await.map_err(route_error)?;
        let wanted = cart.quantity_of(&product.id).saturating_add(args.quantity);
        if !product.can_purchase(wanted) {
            return Ok(replies::cannot_purchase(&product));
        }

        cart.add_item(&product, args.quantity, None);
        self.repos.carts.save(cart).await.map_err(route_error)?;
        info!(
            event_name = "cart.item_added",
            correlation_id = %actor.correlation_id,
            customer_id = %actor.customer_id,
            sku = %product.sku,
            quantity = args.quantity,
            "item added to cart"
        );
        Ok(replies::added_to_cart(&product, args.quantity))
    }

    async fn view_cart(&self, actor: &ActorContext) -> Result<String, CommandRouteError> {
        let cart = self.cart_for(actor).await.map_err(route_error)?;
        Ok(replies::view_cart(&cart))
    }

    async fn remove_from_cart(
        &self,
        position: String,
        quantity: Option<u32>,
        actor: &ActorContext,
    ) -> Result<String, CommandRouteError> {
        let Ok(position) = position.trim().parse::<usize>() else {
            return Ok(replies::invalid_cart_line());
        };

        let mut cart = self.cart_for(actor).await.map_err(route_error)?;
        let Some(line) = position.checked_sub(1).and_then(|index| cart.lines.get(index)).cloned()
        else {
            return Ok(replies::invalid_cart_line());
        };

        let reply = match quantity.filter(|quantity| *quantity < line.quantity) {
            Some(quantity) => {
                let remaining = line.quantity - quantity;
                cart.update_quantity(
                    &line.product_id,
                    line.variant.as_deref(),
                    i64::from(remaining),
                );
                replies::reduced_in_cart(&line, quantity, remaining)
            }
            None => {
                cart.remove_line(position);
                replies::removed_from_cart(&line)
            }
        };
        self.repos.carts.save(cart).await.map_err(route_error)?;
        Ok(reply)
    }

    async fn clear_cart(&self, actor: &ActorContext) -> Result<String, CommandRouteError> {
        self.repos.carts.clear(&actor.customer_id).await.map_err(route_error)?;
        Ok(replies::cart_cleared())
    }

    async fn start_checkout(&self, actor: &ActorContext) -> Result<String, CommandRouteError> {
        let cart = self.cart_for(actor).await.map_err(route_error)?;
        let customer =
            self.repos.customers.find_by_id(&actor.customer_id).await.map_err(route_error)?;
        let known_name = customer.as_ref().and_then(Customer::display_name);

        let outcome = match self.engine.start_checkout(cart.is_empty(), known_name) {
            Ok(outcome) => outcome,
            Err(FlowTransitionError::EmptyCart) => return Ok(replies::empty_cart()),
            Err(error) => return Err(CommandRouteError::Service(error.to_string())),
        };

        let mut session = Session::default();
        session.apply(&outcome);
        self.sessions.store(&actor.customer_id.0, session).await;

        let last_address = customer
            .as_ref()
            .and_then(Customer::default_address)
            .map(|address| address.street.as_str());
        Ok(replies::checkout_intro(&cart, outcome.to == SessionState::CheckoutName, last_address))
    }

    async fn track_order(
        &self,
        order_id: String,
        actor: &ActorContext,
    ) -> Result<String, CommandRouteError> {
        let order_id = OrderId(order_id);
        let Some(order) = self.repos.orders.find_by_id(&order_id).await.map_err(route_error)?
        else {
            return Ok(replies::order_not_found(&order_id.0));
        };

        if order.customer_id != actor.customer_id && !actor.access.can(AdminPermission::Orders) {
            return Ok(replies::order_access_denied());
        }
        Ok(replies::order_detail(&order))
    }

    async fn order_history(&self, actor: &ActorContext) -> Result<String, CommandRouteError> {
        let orders =
            self.repos.orders.list_for_customer(&actor.customer_id).await.map_err(route_error)?;
        Ok(replies::order_history(&orders))
    }

    async fn store_info(&self, _actor: &ActorContext) -> Result<String, CommandRouteError> {
        let stats = self.catalog_view().await.map_err(route_error)?.stats();
        Ok(replies::store_info(&self.store_name, stats.available, stats.categories))
    }
}

#[async_trait]
impl FlowActionExecutor for Storefront {
    async fn flow_context(
        &self,
        actor: &ActorContext,
        state: SessionState,
    ) -> Result<FlowContext, ActionError> {
        let products = match state.flow() {
            Some(FlowType::AdminCatalog) => {
                self.repos.products.list().await.map_err(action_error)?
            }
            _ => Vec::new(),
        };
        Ok(FlowContext { products, access: actor.access.clone() })
    }

    async fn execute(
        &self,
        actor: &ActorContext,
        action: &FlowAction,
        outcome: &TransitionOutcome,
    ) -> Result<Option<String>, ActionError> {
        let reply = match action {
            FlowAction::PromptName => replies::prompt_name(),
            FlowAction::PromptAddress => replies::prompt_address(),
            FlowAction::PromptConfirmation => {
                let (Some(name), Some(address)) = (&outcome.data.name, &outcome.data.address)
                else {
                    return Err(ActionError::Failed("confirmation without name or address".into()));
                };
                let cart = self.cart_for(actor).await.map_err(action_error)?;
                replies::checkout_confirmation(name, address, &cart)
            }
            FlowAction::SaveCustomerName(name) => {
                let mut customer = self.touch_customer(actor).await.map_err(action_error)?;
                customer.name = Some(name.clone());
                self.repos.customers.save(customer).await.map_err(action_error)?;
                return Ok(None);
            }
            FlowAction::PlaceOrder { name, address } => {
                self.place_order(actor, name, address).await?
            }
            FlowAction::CheckoutAborted => replies::checkout_cancelled(),
            FlowAction::ShowAdminMenu => replies::admin_menu(&actor.access),
            FlowAction::ShowOrderOverview => {
                let orders = self.repos.orders.list(None).await.map_err(action_error)?;
                let stats = OrderStatistics::from_orders(&orders);
                let latest = &orders[..orders.len().min(OVERVIEW_ORDERS)];
                replies::order_overview(&stats, latest)
            }
            FlowAction::ShowProductMenu => {
                let products = self.repos.products.list().await.map_err(action_error)?;
                replies::product_menu(&products)
            }
            FlowAction::PromptProductSelection(purpose) => {
                let products = self.repos.products.list().await.map_err(action_error)?;
                replies::product_selection(*purpose, &products)
            }
            FlowAction::PromptProductField { field, editing } => {
                let current = if *editing { outcome.data.selected.as_ref() } else { None };
                replies::product_field_prompt(*field, current)
            }
            FlowAction::CreateProduct(draft) => self.create_product(draft).await?,
            FlowAction::UpdateProduct { product_id, patch } => {
                self.update_product(product_id, patch).await?
            }
            FlowAction::NoChanges => replies::no_product_changes(),
            FlowAction::PromptDeleteConfirmation(product) => replies::delete_confirmation(product),
            FlowAction::DeleteProduct(product_id) => self.delete_product(product_id).await?,
            FlowAction::DeleteCancelled => replies::delete_cancelled(),
            FlowAction::ExitPanel => replies::panel_closed(),
            FlowAction::FlowCancelled => replies::flow_cancelled(),
        };
        Ok(Some(reply))
    }
}
