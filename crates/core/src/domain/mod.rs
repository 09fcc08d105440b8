pub mod admin;
pub mod cart;
pub mod catalog;
pub mod customer;
pub mod notification;
pub mod order;
pub mod product;
