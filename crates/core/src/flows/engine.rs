use rust_decimal::Decimal;
use thiserror::Error;

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::commands::{is_affirmative, is_cancel, is_skip};
use crate::domain::admin::{AdminAccess, AdminPermission};
use crate::domain::product::{normalize_category, Product, ProductPatch};
use crate::flows::states::{
    FlowAction, FlowContext, FlowInput, FlowType, ProductField, SelectionPurpose, SessionData,
    SessionState, TransitionOutcome,
};

pub trait FlowDefinition {
    fn flow_type(&self) -> FlowType;
    fn initial_state(&self) -> SessionState;
    fn transition(
        &self,
        current: SessionState,
        data: &SessionData,
        input: &FlowInput,
        context: &FlowContext,
    ) -> Result<TransitionOutcome, FlowTransitionError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputRejection {
    EmptyText,
    InvalidPrice,
    InvalidStock,
    InvalidSelection { max: usize },
    UnknownOption,
    ExpectedConfirmation,
    MissingImage,
    EmptyCatalog,
    MissingSessionData,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlowTransitionError {
    #[error("input rejected in {state}: {reason:?}")]
    InvalidInput { state: SessionState, reason: InputRejection },
    #[error("no active flow for this actor")]
    NotActive,
    #[error("cart is empty")]
    EmptyCart,
    #[error("actor is not an administrator")]
    NotAdmin,
    #[error("{permission:?} permission required in {state}")]
    PermissionDenied { state: SessionState, permission: AdminPermission },
}

impl FlowTransitionError {
    fn rejected(state: SessionState, reason: InputRejection) -> Self {
        Self::InvalidInput { state, reason }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct CheckoutFlow;

impl FlowDefinition for CheckoutFlow {
    fn flow_type(&self) -> FlowType {
        FlowType::Checkout
    }

    fn initial_state(&self) -> SessionState {
        SessionState::CheckoutName
    }

    fn transition(
        &self,
        current: SessionState,
        data: &SessionData,
        input: &FlowInput,
        _context: &FlowContext,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        let mut next = data.clone();

        match current {
            SessionState::CheckoutName => {
                let name = required_text(current, &input.text)?;
                next.name = Some(name.clone());
                Ok(outcome(
                    current,
                    SessionState::CheckoutAddress,
                    vec![FlowAction::SaveCustomerName(name), FlowAction::PromptAddress],
                    next,
                ))
            }
            SessionState::CheckoutAddress => {
                next.address = Some(required_text(current, &input.text)?);
                Ok(outcome(
                    current,
                    SessionState::CheckoutConfirm,
                    vec![FlowAction::PromptConfirmation],
                    next,
                ))
            }
            SessionState::CheckoutConfirm => {
                if !is_affirmative(&input.text) {
                    return Err(FlowTransitionError::rejected(
                        current,
                        InputRejection::ExpectedConfirmation,
                    ));
                }
                let (Some(name), Some(address)) = (data.name.clone(), data.address.clone()) else {
                    return Err(FlowTransitionError::rejected(
                        current,
                        InputRejection::MissingSessionData,
                    ));
                };
                Ok(outcome(
                    current,
                    SessionState::Idle,
                    vec![FlowAction::PlaceOrder { name, address }],
                    SessionData::default(),
                ))
            }
            _ => Err(FlowTransitionError::NotActive),
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct AdminCatalogFlow;

impl FlowDefinition for AdminCatalogFlow {
    fn flow_type(&self) -> FlowType {
        FlowType::AdminCatalog
    }

    fn initial_state(&self) -> SessionState {
        SessionState::AdminMenu
    }

    fn transition(
        &self,
        current: SessionState,
        data: &SessionData,
        input: &FlowInput,
        context: &FlowContext,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        let choice = input.text.trim();

        match current {
            SessionState::AdminMenu => match choice {
                "1" => {
                    require(current, &context.access, AdminPermission::Products)?;
                    Ok(outcome(
                        current,
                        SessionState::ProductMenu,
                        vec![FlowAction::ShowProductMenu],
                        SessionData::default(),
                    ))
                }
                "2" => {
                    require(current, &context.access, AdminPermission::Orders)?;
                    Ok(outcome(
                        current,
                        SessionState::AdminMenu,
                        vec![FlowAction::ShowOrderOverview],
                        data.clone(),
                    ))
                }
                "0" => Ok(outcome(
                    current,
                    SessionState::Idle,
                    vec![FlowAction::ExitPanel],
                    SessionData::default(),
                )),
                _ => Err(FlowTransitionError::rejected(current, InputRejection::UnknownOption)),
            },
            SessionState::ProductMenu => match choice {
                "1" => Ok(outcome(
                    current,
                    SessionState::AddProduct(ProductField::Name),
                    vec![FlowAction::PromptProductField { field: ProductField::Name, editing: false }],
                    SessionData::default(),
                )),
                "2" | "3" => {
                    if context.products.is_empty() {
                        return Err(FlowTransitionError::rejected(
                            current,
                            InputRejection::EmptyCatalog,
                        ));
                    }
                    let (to, purpose) = if choice == "2" {
                        (SessionState::EditProductSelect, SelectionPurpose::Edit)
                    } else {
                        (SessionState::DeleteProductSelect, SelectionPurpose::Delete)
                    };
                    Ok(outcome(
                        current,
                        to,
                        vec![FlowAction::PromptProductSelection(purpose)],
                        SessionData::default(),
                    ))
                }
                "0" => Ok(outcome(
                    current,
                    SessionState::AdminMenu,
                    vec![FlowAction::ShowAdminMenu],
                    SessionData::default(),
                )),
                _ => Err(FlowTransitionError::rejected(current, InputRejection::UnknownOption)),
            },
            SessionState::AddProduct(field) => add_product_step(current, field, data, input),
            SessionState::EditProductSelect => {
                let product = select_product(current, choice, context)?;
                let next = SessionData { selected: Some(product), ..SessionData::default() };
                Ok(outcome(
                    current,
                    SessionState::EditProduct(ProductField::Name),
                    vec![FlowAction::PromptProductField { field: ProductField::Name, editing: true }],
                    next,
                ))
            }
            SessionState::EditProduct(field) => edit_product_step(current, field, data, input),
            SessionState::DeleteProductSelect => {
                let product = select_product(current, choice, context)?;
                let next =
                    SessionData { selected: Some(product.clone()), ..SessionData::default() };
                Ok(outcome(
                    current,
                    SessionState::DeleteProductConfirm,
                    vec![FlowAction::PromptDeleteConfirmation(product)],
                    next,
                ))
            }
            SessionState::DeleteProductConfirm => match choice {
                "1" => {
                    let Some(product) = &data.selected else {
                        return Err(FlowTransitionError::rejected(
                            current,
                            InputRejection::MissingSessionData,
                        ));
                    };
                    Ok(outcome(
                        current,
                        SessionState::Idle,
                        vec![FlowAction::DeleteProduct(product.id.clone())],
                        SessionData::default(),
                    ))
                }
                "0" => Ok(outcome(
                    current,
                    SessionState::ProductMenu,
                    vec![FlowAction::DeleteCancelled, FlowAction::ShowProductMenu],
                    SessionData::default(),
                )),
                _ => Err(FlowTransitionError::rejected(current, InputRejection::UnknownOption)),
            },
            _ => Err(FlowTransitionError::NotActive),
        }
    }
}

/// Routes session input to the flow owning the current state.
#[derive(Clone, Debug, Default)]
pub struct FlowEngine {
    checkout: CheckoutFlow,
    admin: AdminCatalogFlow,
}

impl FlowEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enters checkout. The name step is skipped when the profile already has one.
    pub fn start_checkout(
        &self,
        cart_is_empty: bool,
        known_name: Option<&str>,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        if cart_is_empty {
            return Err(FlowTransitionError::EmptyCart);
        }

        let known_name = known_name.map(str::trim).filter(|name| !name.is_empty());
        Ok(match known_name {
            Some(name) => outcome(
                SessionState::Idle,
                SessionState::CheckoutAddress,
                vec![FlowAction::PromptAddress],
                SessionData { name: Some(name.to_owned()), ..SessionData::default() },
            ),
            None => outcome(
                SessionState::Idle,
                self.checkout.initial_state(),
                vec![FlowAction::PromptName],
                SessionData::default(),
            ),
        })
    }

    pub fn open_admin_panel(
        &self,
        access: &AdminAccess,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        if !access.is_admin() {
            return Err(FlowTransitionError::NotAdmin);
        }

        Ok(outcome(
            SessionState::Idle,
            self.admin.initial_state(),
            vec![FlowAction::ShowAdminMenu],
            SessionData::default(),
        ))
    }

    /// Interprets input strictly by state. Cancel words end any flow.
    pub fn apply(
        &self,
        current: SessionState,
        data: &SessionData,
        input: &FlowInput,
        context: &FlowContext,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        let Some(flow_type) = current.flow() else {
            return Err(FlowTransitionError::NotActive);
        };

        if is_cancel(&input.text) {
            let action = match flow_type {
                FlowType::Checkout => FlowAction::CheckoutAborted,
                FlowType::AdminCatalog => FlowAction::FlowCancelled,
            };
            return Ok(outcome(current, SessionState::Idle, vec![action], SessionData::default()));
        }

        match flow_type {
            FlowType::Checkout => self.checkout.transition(current, data, input, context),
            FlowType::AdminCatalog => self.admin.transition(current, data, input, context),
        }
    }

    pub fn apply_with_audit<S>(
        &self,
        current: SessionState,
        data: &SessionData,
        input: &FlowInput,
        context: &FlowContext,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<TransitionOutcome, FlowTransitionError>
    where
        S: AuditSink + ?Sized,
    {
        let result = self.apply(current, data, input, context);
        match &result {
            Ok(outcome) => {
                sink.emit(
                    AuditEvent::new(
                        audit,
                        "flow.transition_applied",
                        AuditCategory::Flow,
                        AuditOutcome::Success,
                    )
                    .with_metadata("from", outcome.from.as_str())
                    .with_metadata("to", outcome.to.as_str()),
                );
            }
            Err(error) => {
                sink.emit(
                    AuditEvent::new(
                        audit,
                        "flow.transition_rejected",
                        AuditCategory::Flow,
                        AuditOutcome::Rejected,
                    )
                    .with_metadata("state", current.as_str())
                    .with_metadata("error", error.to_string()),
                );
            }
        }
        result
    }
}

fn outcome(
    from: SessionState,
    to: SessionState,
    actions: Vec<FlowAction>,
    data: SessionData,
) -> TransitionOutcome {
    TransitionOutcome { from, to, actions, data }
}

fn require(
    state: SessionState,
    access: &AdminAccess,
    permission: AdminPermission,
) -> Result<(), FlowTransitionError> {
    if access.can(permission) {
        Ok(())
    } else {
        Err(FlowTransitionError::PermissionDenied { state, permission })
    }
}

fn required_text(state: SessionState, raw: &str) -> Result<String, FlowTransitionError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(FlowTransitionError::rejected(state, InputRejection::EmptyText));
    }
    Ok(trimmed.to_owned())
}

/// Positive whole rupiah. Dots are accepted as thousands separators.
fn parse_price(state: SessionState, raw: &str) -> Result<Decimal, FlowTransitionError> {
    let digits = raw.trim().replace('.', "");
    match digits.parse::<u64>() {
        Ok(value) if value > 0 => Ok(Decimal::from(value)),
        _ => Err(FlowTransitionError::rejected(state, InputRejection::InvalidPrice)),
    }
}

fn parse_stock(state: SessionState, raw: &str) -> Result<u32, FlowTransitionError> {
    raw.trim()
        .parse::<u32>()
        .map_err(|_| FlowTransitionError::rejected(state, InputRejection::InvalidStock))
}

fn parse_image(
    state: SessionState,
    input: &FlowInput,
) -> Result<Option<String>, FlowTransitionError> {
    if let Some(attachment) = &input.attachment {
        return Ok(Some(attachment.clone()));
    }

    let text = input.text.trim();
    if is_skip(text) {
        return Ok(None);
    }
    let lowered = text.to_ascii_lowercase();
    if lowered.starts_with("http://") || lowered.starts_with("https://") {
        return Ok(Some(text.to_owned()));
    }

    Err(FlowTransitionError::rejected(state, InputRejection::MissingImage))
}

/// Writes one parsed field value into the patch.
fn collect_field(
    state: SessionState,
    field: ProductField,
    input: &FlowInput,
    patch: &mut ProductPatch,
) -> Result<(), FlowTransitionError> {
    match field {
        ProductField::Name => patch.name = Some(required_text(state, &input.text)?),
        ProductField::Description => patch.description = Some(required_text(state, &input.text)?),
        ProductField::Price => patch.price = Some(parse_price(state, &input.text)?),
        ProductField::Stock => patch.stock = Some(parse_stock(state, &input.text)?),
        ProductField::Category => {
            patch.category = Some(normalize_category(&required_text(state, &input.text)?))
        }
        ProductField::Image => patch.image = parse_image(state, input)?,
    }
    Ok(())
}

fn add_product_step(
    current: SessionState,
    field: ProductField,
    data: &SessionData,
    input: &FlowInput,
) -> Result<TransitionOutcome, FlowTransitionError> {
    let mut next = data.clone();
    collect_field(current, field, input, &mut next.patch)?;

    if let Some(following) = field.next() {
        return Ok(outcome(
            current,
            SessionState::AddProduct(following),
            vec![FlowAction::PromptProductField { field: following, editing: false }],
            next,
        ));
    }

    let Some(draft) = next.patch.into_draft() else {
        return Err(FlowTransitionError::rejected(current, InputRejection::MissingSessionData));
    };
    Ok(outcome(
        current,
        SessionState::Idle,
        vec![FlowAction::CreateProduct(draft)],
        SessionData::default(),
    ))
}

fn edit_product_step(
    current: SessionState,
    field: ProductField,
    data: &SessionData,
    input: &FlowInput,
) -> Result<TransitionOutcome, FlowTransitionError> {
    let mut next = data.clone();
    let skipped = input.attachment.is_none() && is_skip(&input.text);
    if !skipped {
        collect_field(current, field, input, &mut next.patch)?;
    }

    if let Some(following) = field.next() {
        return Ok(outcome(
            current,
            SessionState::EditProduct(following),
            vec![FlowAction::PromptProductField { field: following, editing: true }],
            next,
        ));
    }

    let Some(product) = next.selected.take() else {
        return Err(FlowTransitionError::rejected(current, InputRejection::MissingSessionData));
    };
    let action = if next.patch.is_empty() {
        FlowAction::NoChanges
    } else {
        FlowAction::UpdateProduct { product_id: product.id, patch: next.patch }
    };
    Ok(outcome(current, SessionState::Idle, vec![action], SessionData::default()))
}

fn select_product(
    state: SessionState,
    choice: &str,
    context: &FlowContext,
) -> Result<Product, FlowTransitionError> {
    let max = context.products.len();
    choice
        .parse::<usize>()
        .ok()
        .filter(|index| (1..=max).contains(index))
        .and_then(|index| context.products.get(index - 1).cloned())
        .ok_or_else(|| {
            FlowTransitionError::rejected(state, InputRejection::InvalidSelection { max })
        })
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::audit::{AuditContext, InMemoryAuditSink};
    use crate::domain::admin::{AdminAccess, AdminLevel, AdminPermission};
    use crate::domain::product::{Product, ProductDraft, ProductId};
    use crate::flows::engine::{
        AdminCatalogFlow, CheckoutFlow, FlowDefinition, FlowEngine, FlowTransitionError,
        InputRejection,
    };
    use crate::flows::states::{
        FlowAction, FlowContext, FlowInput, FlowType, ProductField, SessionData, SessionState,
    };

    fn product(id: &str, name: &str) -> Product {
        Product::from_draft(
            ProductId(id.to_owned()),
            format!("SKU{id}"),
            ProductDraft {
                name: name.to_owned(),
                description: "desc".to_owned(),
                price: Decimal::new(10_000, 0),
                stock: 3,
                category: "umum".to_owned(),
                image: None,
            },
        )
    }

    fn admin_context(products: Vec<Product>) -> FlowContext {
        FlowContext { products, access: AdminAccess::super_admin() }
    }

    fn drive(
        engine: &FlowEngine,
        mut state: SessionState,
        mut data: SessionData,
        inputs: &[&str],
        context: &FlowContext,
    ) -> (SessionState, SessionData, Vec<FlowAction>) {
        let mut actions = Vec::new();
        for input in inputs {
            let outcome = engine
                .apply(state, &data, &FlowInput::text(*input), context)
                .expect("scripted input should be accepted");
            state = outcome.to;
            data = outcome.data;
            actions = outcome.actions;
        }
        (state, data, actions)
    }

    #[test]
    fn checkout_happy_path_places_order_and_returns_to_idle() {
        let engine = FlowEngine::new();
        let start = engine.start_checkout(false, None).expect("non-empty cart");
        assert_eq!(start.to, SessionState::CheckoutName);
        assert_eq!(start.actions, vec![FlowAction::PromptName]);

        let context = FlowContext::default();
        let name = engine
            .apply(start.to, &start.data, &FlowInput::text(" Budi "), &context)
            .expect("name accepted");
        assert_eq!(name.actions[0], FlowAction::SaveCustomerName("Budi".to_owned()));

        let (state, _, actions) =
            drive(&engine, name.to, name.data, &["Jl. Merdeka 1", "YA"], &context);

        assert_eq!(state, SessionState::Idle);
        assert_eq!(
            actions,
            vec![FlowAction::PlaceOrder {
                name: "Budi".to_owned(),
                address: "Jl. Merdeka 1".to_owned()
            }]
        );
    }

    #[test]
    fn checkout_skips_name_when_profile_has_one() {
        let outcome = FlowEngine::new().start_checkout(false, Some("Sari")).expect("start");
        assert_eq!(outcome.to, SessionState::CheckoutAddress);
        assert_eq!(outcome.data.name.as_deref(), Some("Sari"));
    }

    #[test]
    fn checkout_requires_items() {
        let error = FlowEngine::new().start_checkout(true, None).expect_err("empty cart");
        assert_eq!(error, FlowTransitionError::EmptyCart);
    }

    #[test]
    fn confirmation_reasks_on_unrecognized_reply_and_aborts_on_cancel() {
        let engine = FlowEngine::new();
        let data = SessionData {
            name: Some("Budi".to_owned()),
            address: Some("Jl. Merdeka".to_owned()),
            ..SessionData::default()
        };
        let context = FlowContext::default();

        let error = engine
            .apply(SessionState::CheckoutConfirm, &data, &FlowInput::text("mungkin"), &context)
            .expect_err("must re-ask");
        assert_eq!(
            error,
            FlowTransitionError::InvalidInput {
                state: SessionState::CheckoutConfirm,
                reason: InputRejection::ExpectedConfirmation,
            }
        );

        let aborted = engine
            .apply(SessionState::CheckoutConfirm, &data, &FlowInput::text("batal"), &context)
            .expect("cancel accepted");
        assert_eq!(aborted.to, SessionState::Idle);
        assert_eq!(aborted.actions, vec![FlowAction::CheckoutAborted]);
        assert_eq!(aborted.data, SessionData::default());
    }

    #[test]
    fn command_words_inside_a_session_are_plain_input() {
        let engine = FlowEngine::new();
        let outcome = engine
            .apply(
                SessionState::CheckoutName,
                &SessionData::default(),
                &FlowInput::text("KATALOG"),
                &FlowContext::default(),
            )
            .expect("treated as a name");
        assert_eq!(outcome.data.name.as_deref(), Some("KATALOG"));
    }

    #[test]
    fn blank_text_is_rejected_without_advancing() {
        let error = FlowEngine::new()
            .apply(
                SessionState::CheckoutAddress,
                &SessionData::default(),
                &FlowInput::text("   "),
                &FlowContext::default(),
            )
            .expect_err("blank address");
        assert!(matches!(
            error,
            FlowTransitionError::InvalidInput { reason: InputRejection::EmptyText, .. }
        ));
    }

    #[test]
    fn admin_panel_requires_admin_access() {
        let engine = FlowEngine::new();
        assert_eq!(
            engine.open_admin_panel(&AdminAccess::user()).expect_err("user denied"),
            FlowTransitionError::NotAdmin
        );
        let opened = engine.open_admin_panel(&AdminAccess::super_admin()).expect("admin");
        assert_eq!(opened.to, SessionState::AdminMenu);
    }

    #[test]
    fn product_menu_needs_products_permission() {
        let engine = FlowEngine::new();
        let context = FlowContext {
            products: Vec::new(),
            access: AdminAccess {
                level: AdminLevel::Admin,
                permissions: [AdminPermission::Orders].into_iter().collect(),
            },
        };

        let error = engine
            .apply(SessionState::AdminMenu, &SessionData::default(), &FlowInput::text("1"), &context)
            .expect_err("orders-only admin");
        assert!(matches!(error, FlowTransitionError::PermissionDenied { .. }));

        let overview = engine
            .apply(SessionState::AdminMenu, &SessionData::default(), &FlowInput::text("2"), &context)
            .expect("orders permission");
        assert_eq!(overview.to, SessionState::AdminMenu);
        assert_eq!(overview.actions, vec![FlowAction::ShowOrderOverview]);
    }

    #[test]
    fn add_product_flow_reprompts_negative_price_then_creates_product() {
        let engine = FlowEngine::new();
        let context = admin_context(Vec::new());
        let (state, data, _) = drive(
            &engine,
            SessionState::ProductMenu,
            SessionData::default(),
            &["1", "Kopi Gayo", "Arabica 250g"],
            &context,
        );
        assert_eq!(state, SessionState::AddProduct(ProductField::Price));

        let error = engine
            .apply(state, &data, &FlowInput::text("-100"), &context)
            .expect_err("negative price");
        assert_eq!(
            error,
            FlowTransitionError::InvalidInput { state, reason: InputRejection::InvalidPrice }
        );

        let (state, data, _) = drive(&engine, state, data, &["50.000", "12", "Minuman"], &context);
        assert_eq!(state, SessionState::AddProduct(ProductField::Image));
        assert!(engine.apply(state, &data, &FlowInput::text("gambar"), &context).is_err());

        let done = engine
            .apply(state, &data, &FlowInput::text("").with_attachment("media://abc"), &context)
            .expect("attachment accepted");

        assert_eq!(done.to, SessionState::Idle);
        let [FlowAction::CreateProduct(draft)] = done.actions.as_slice() else {
            panic!("expected a create action, got {:?}", done.actions);
        };
        assert_eq!(draft.price, Decimal::new(50_000, 0));
        assert_eq!(draft.stock, 12);
        assert_eq!(draft.category, "minuman");
        assert_eq!(draft.image.as_deref(), Some("media://abc"));
    }

    #[test]
    fn edit_flow_collects_only_non_skipped_fields() {
        let engine = FlowEngine::new();
        let context = admin_context(vec![product("P-1", "Kopi"), product("P-2", "Teh")]);

        let error = engine
            .apply(
                SessionState::EditProductSelect,
                &SessionData::default(),
                &FlowInput::text("3"),
                &context,
            )
            .expect_err("out of range");
        assert!(matches!(
            error,
            FlowTransitionError::InvalidInput {
                reason: InputRejection::InvalidSelection { max: 2 },
                ..
            }
        ));

        let (state, _, actions) = drive(
            &engine,
            SessionState::EditProductSelect,
            SessionData::default(),
            &["2", "SKIP", "skip", "15000", "SKIP", "SKIP", "SKIP"],
            &context,
        );

        assert_eq!(state, SessionState::Idle);
        let [FlowAction::UpdateProduct { product_id, patch }] = actions.as_slice() else {
            panic!("expected an update action, got {actions:?}");
        };
        assert_eq!(product_id.0, "P-2");
        assert_eq!(patch.price, Some(Decimal::new(15_000, 0)));
        assert!(patch.name.is_none());
    }

    #[test]
    fn edit_flow_with_all_fields_skipped_reports_no_changes() {
        let engine = FlowEngine::new();
        let context = admin_context(vec![product("P-1", "Kopi")]);
        let (_, _, actions) = drive(
            &engine,
            SessionState::EditProductSelect,
            SessionData::default(),
            &["1", "SKIP", "SKIP", "SKIP", "SKIP", "SKIP", "SKIP"],
            &context,
        );
        assert_eq!(actions, vec![FlowAction::NoChanges]);
    }

    #[test]
    fn delete_flow_confirms_or_returns_to_product_menu() {
        let engine = FlowEngine::new();
        let context = admin_context(vec![product("P-1", "Kopi")]);

        let (state, data, _) =
            drive(&engine, SessionState::DeleteProductSelect, SessionData::default(), &["1"], &context);
        assert_eq!(state, SessionState::DeleteProductConfirm);

        let deleted =
            engine.apply(state, &data, &FlowInput::text("1"), &context).expect("delete confirmed");
        assert_eq!(deleted.actions, vec![FlowAction::DeleteProduct(ProductId("P-1".to_owned()))]);

        let kept = engine.apply(state, &data, &FlowInput::text("0"), &context).expect("kept");
        assert_eq!(kept.to, SessionState::ProductMenu);
    }

    #[test]
    fn edit_and_delete_need_products() {
        let error = FlowEngine::new()
            .apply(
                SessionState::ProductMenu,
                &SessionData::default(),
                &FlowInput::text("3"),
                &admin_context(Vec::new()),
            )
            .expect_err("empty catalog");
        assert!(matches!(
            error,
            FlowTransitionError::InvalidInput { reason: InputRejection::EmptyCatalog, .. }
        ));
    }

    #[test]
    fn idle_state_is_not_handled() {
        let error = FlowEngine::new()
            .apply(
                SessionState::Idle,
                &SessionData::default(),
                &FlowInput::text("halo"),
                &FlowContext::default(),
            )
            .expect_err("idle");
        assert_eq!(error, FlowTransitionError::NotActive);
        assert_eq!(CheckoutFlow.flow_type(), FlowType::Checkout);
        assert_eq!(AdminCatalogFlow.initial_state(), SessionState::AdminMenu);
    }

    #[test]
    fn flow_transition_emits_audit_event() {
        let engine = FlowEngine::new();
        let sink = InMemoryAuditSink::default();

        let _ = engine.apply_with_audit(
            SessionState::CheckoutConfirm,
            &SessionData::default(),
            &FlowInput::text("hmm"),
            &FlowContext::default(),
            &sink,
            &AuditContext::new(None, None, "req-42", "session"),
        );

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].correlation_id, "req-42");
        assert_eq!(events[0].event_type, "flow.transition_rejected");
        assert_eq!(events[0].metadata.get("state").map(String::as_str), Some("checkout_confirm"));
    }
}
