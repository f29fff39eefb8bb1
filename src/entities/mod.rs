pub mod company;
pub mod company_integration;
pub mod customer;
pub mod equipment_loan;
pub mod equipment_return;
pub mod financial_record;
pub mod invoice;
pub mod notification;
pub mod order;
pub mod order_item;
pub mod payment_method;
pub mod product;
pub mod supplier;
pub mod user;
