pub mod audit;
pub mod commands;
pub mod config;
pub mod domain;
pub mod errors;
pub mod flows;

pub use commands::{parse_command, Command, ParsedCommand};
pub use domain::admin::{AdminAccess, AdminDirectory, AdminLevel, AdminPermission};
pub use domain::cart::{Cart, CartLine};
pub use domain::catalog::{Catalog, CatalogStats, CategorySummary};
pub use domain::customer::{Address, Customer, CustomerId, CustomerStatistics};
pub use domain::notification::Notification;
pub use domain::order::{
    Order, OrderId, OrderStatistics, OrderStatus, PaymentStatus, ShippingAddress,
};
pub use domain::product::{Product, ProductDraft, ProductId, ProductPatch, ProductVariant};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use flows::{FlowEngine, FlowTransitionError, Session, SessionState};
