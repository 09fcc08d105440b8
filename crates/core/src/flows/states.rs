use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::admin::AdminAccess;
use crate::domain::product::{Product, ProductDraft, ProductId, ProductPatch};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowType {
    Checkout,
    AdminCatalog,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductField {
    Name,
    Description,
    Price,
    Stock,
    Category,
    Image,
}

impl ProductField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Description => "description",
            Self::Price => "price",
            Self::Stock => "stock",
            Self::Category => "category",
            Self::Image => "image",
        }
    }

    pub fn next(self) -> Option<Self> {
        match self {
            Self::Name => Some(Self::Description),
            Self::Description => Some(Self::Price),
            Self::Price => Some(Self::Stock),
            Self::Stock => Some(Self::Category),
            Self::Category => Some(Self::Image),
            Self::Image => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Idle,
    CheckoutName,
    CheckoutAddress,
    CheckoutConfirm,
    AdminMenu,
    ProductMenu,
    AddProduct(ProductField),
    EditProductSelect,
    EditProduct(ProductField),
    DeleteProductSelect,
    DeleteProductConfirm,
}

impl SessionState {
    pub fn as_str(self) -> &'static str {
        use ProductField::{Category, Description, Image, Name, Price, Stock};

        match self {
            Self::Idle => "idle",
            Self::CheckoutName => "checkout_name",
            Self::CheckoutAddress => "checkout_address",
            Self::CheckoutConfirm => "checkout_confirm",
            Self::AdminMenu => "admin_menu",
            Self::ProductMenu => "product_menu",
            Self::AddProduct(Name) => "add_product_name",
            Self::AddProduct(Description) => "add_product_description",
            Self::AddProduct(Price) => "add_product_price",
            Self::AddProduct(Stock) => "add_product_stock",
            Self::AddProduct(Category) => "add_product_category",
            Self::AddProduct(Image) => "add_product_image",
            Self::EditProductSelect => "edit_product_select",
            Self::EditProduct(Name) => "edit_product_name",
            Self::EditProduct(Description) => "edit_product_description",
            Self::EditProduct(Price) => "edit_product_price",
            Self::EditProduct(Stock) => "edit_product_stock",
            Self::EditProduct(Category) => "edit_product_category",
            Self::EditProduct(Image) => "edit_product_image",
            Self::DeleteProductSelect => "delete_product_select",
            Self::DeleteProductConfirm => "delete_product_confirm",
        }
    }

    pub fn flow(self) -> Option<FlowType> {
        match self {
            Self::Idle => None,
            Self::CheckoutName | Self::CheckoutAddress | Self::CheckoutConfirm => {
                Some(FlowType::Checkout)
            }
            Self::AdminMenu
            | Self::ProductMenu
            | Self::AddProduct(_)
            | Self::EditProductSelect
            | Self::EditProduct(_)
            | Self::DeleteProductSelect
            | Self::DeleteProductConfirm => Some(FlowType::AdminCatalog),
        }
    }

    pub fn is_idle(self) -> bool {
        self == Self::Idle
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Values collected while a flow is in progress.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    pub name: Option<String>,
    pub address: Option<String>,
    pub patch: ProductPatch,
    pub selected: Option<Product>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub state: SessionState,
    pub data: SessionData,
    pub updated_at: DateTime<Utc>,
}

impl Default for Session {
    fn default() -> Self {
        Self { state: SessionState::Idle, data: SessionData::default(), updated_at: Utc::now() }
    }
}

impl Session {
    /// A zero timeout never expires.
    pub fn is_expired(&self, idle_timeout: Duration, now: DateTime<Utc>) -> bool {
        idle_timeout > Duration::zero() && now - self.updated_at > idle_timeout
    }

    pub fn apply(&mut self, outcome: &TransitionOutcome) {
        self.state = outcome.to;
        self.data = outcome.data.clone();
        self.updated_at = Utc::now();
    }
}

/// One inbound message as seen by a flow.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FlowInput {
    pub text: String,
    /// Reference to attached media, when the message carried one.
    pub attachment: Option<String>,
}

impl FlowInput {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into(), attachment: None }
    }

    pub fn with_attachment(mut self, attachment: impl Into<String>) -> Self {
        self.attachment = Some(attachment.into());
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FlowContext {
    /// Products in the order they are listed to the admin.
    pub products: Vec<Product>,
    pub access: AdminAccess,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionPurpose {
    Edit,
    Delete,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowAction {
    PromptName,
    PromptAddress,
    PromptConfirmation,
    SaveCustomerName(String),
    PlaceOrder { name: String, address: String },
    CheckoutAborted,
    ShowAdminMenu,
    ShowOrderOverview,
    ShowProductMenu,
    PromptProductSelection(SelectionPurpose),
    PromptProductField { field: ProductField, editing: bool },
    CreateProduct(ProductDraft),
    UpdateProduct { product_id: ProductId, patch: ProductPatch },
    NoChanges,
    PromptDeleteConfirmation(Product),
    DeleteProduct(ProductId),
    DeleteCancelled,
    ExitPanel,
    FlowCancelled,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: SessionState,
    pub to: SessionState,
    pub actions: Vec<FlowAction>,
    pub data: SessionData,
}

impl TransitionOutcome {
    pub fn is_terminal(&self) -> bool {
        self.to.is_idle()
    }
}
