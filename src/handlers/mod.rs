pub mod asaas;
pub mod common;
pub mod company;
pub mod customers;
pub mod dashboard;
pub mod email;
pub mod equipment;
pub mod financial;
pub mod health;
pub mod integrations;
pub mod mercadopago;
pub mod nfe;
pub mod notifications;
pub mod orders;
pub mod payment_methods;
pub mod products;
pub mod suppliers;
pub mod users;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::errors::ServiceError;
use crate::integrations::build_http_client;
use crate::services::{
    asaas_sync::AsaasSyncService, companies::CompanyService, customers::CustomerService,
    dashboard::DashboardService, email::EmailService, equipment::EquipmentService,
    financial::FinancialService, integrations::IntegrationService, invoices::InvoiceService,
    notifications::NotificationService, orders::OrderService,
    payment_methods::PaymentMethodService, payments::PaymentService, products::ProductService,
    suppliers::SupplierService, users::UserService,
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub companies: Arc<CompanyService>,
    pub users: Arc<UserService>,
    pub customers: Arc<CustomerService>,
    pub suppliers: Arc<SupplierService>,
    pub products: Arc<ProductService>,
    pub payment_methods: Arc<PaymentMethodService>,
    pub orders: Arc<OrderService>,
    pub financial: Arc<FinancialService>,
    pub equipment: Arc<EquipmentService>,
    pub notifications: Arc<NotificationService>,
    pub integrations: Arc<IntegrationService>,
    pub asaas_sync: Arc<AsaasSyncService>,
    pub payments: Arc<PaymentService>,
    pub invoices: Arc<InvoiceService>,
    pub email: Arc<EmailService>,
    pub dashboard: Arc<DashboardService>,
}

impl AppServices {
    /// Wires every service over one pool and one outbound HTTP client.
    pub fn new(db_pool: Arc<DbPool>, config: &AppConfig) -> Result<Self, ServiceError> {
        let integrations_config = Arc::new(config.integrations.clone());
        let http = build_http_client(integrations_config.http_timeout())?;

        let companies = CompanyService::new(db_pool.clone());
        let customers = CustomerService::new(db_pool.clone());
        let orders = OrderService::new(db_pool.clone());
        let integrations = IntegrationService::new(db_pool.clone(), integrations_config);
        let asaas_sync =
            AsaasSyncService::new(http.clone(), customers.clone(), integrations.clone());
        let payments = PaymentService::new(
            db_pool.clone(),
            http.clone(),
            integrations.clone(),
            asaas_sync.clone(),
        );
        let invoices = InvoiceService::new(
            db_pool.clone(),
            http.clone(),
            integrations.clone(),
            companies.clone(),
            orders.clone(),
        );
        let email = EmailService::new(
            db_pool.clone(),
            http,
            integrations.clone(),
            companies.clone(),
        );

        Ok(Self {
            companies: Arc::new(companies),
            users: Arc::new(UserService::new(db_pool.clone())),
            customers: Arc::new(customers),
            suppliers: Arc::new(SupplierService::new(db_pool.clone())),
            products: Arc::new(ProductService::new(db_pool.clone())),
            payment_methods: Arc::new(PaymentMethodService::new(db_pool.clone())),
            orders: Arc::new(orders),
            financial: Arc::new(FinancialService::new(db_pool.clone())),
            equipment: Arc::new(EquipmentService::new(db_pool.clone())),
            notifications: Arc::new(NotificationService::new(db_pool.clone())),
            integrations: Arc::new(integrations),
            asaas_sync: Arc::new(asaas_sync),
            payments: Arc::new(payments),
            invoices: Arc::new(invoices),
            email: Arc::new(email),
            dashboard: Arc::new(DashboardService::new(db_pool)),
        })
    }
}
