pub mod engine;
pub mod states;

pub use engine::{
    AdminCatalogFlow, CheckoutFlow, FlowDefinition, FlowEngine, FlowTransitionError,
    InputRejection,
};
pub use states::{
    FlowAction, FlowContext, FlowInput, FlowType, ProductField, SelectionPurpose, Session,
    SessionData, SessionState, TransitionOutcome,
};
