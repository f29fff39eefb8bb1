use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Distribuidora API",
        version = "1.0.0",
        description = r#"
# Distribuidora de Bebidas: back-office API

Multi-tenant management for beverage distributors: customers, suppliers,
products and stock, orders, receivables and payables, equipment loans and
the Brazilian payment and tax providers (Asaas boletos, Mercado Pago PIX,
Focus NFe and SendGrid).

## Authentication

Obtain a token at `POST /auth/login` and send it on every `/api` call:

```
Authorization: Bearer <token>
```

Every record belongs to the company carried by the token.

## Errors

Failures return an `ErrorResponse` body. Overdue customers are refused new
orders with `409` unless an admin sets `override_overdue`.
"#
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "auth", description = "Login"),
        (name = "company", description = "Tenant profile"),
        (name = "users", description = "Users of the company"),
        (name = "customers", description = "Customers"),
        (name = "suppliers", description = "Suppliers"),
        (name = "products", description = "Products and stock"),
        (name = "payment-methods", description = "Payment methods"),
        (name = "orders", description = "Sales orders"),
        (name = "financial", description = "Receivables and payables"),
        (name = "equipment", description = "Equipment loans and returns"),
        (name = "notifications", description = "In-app notifications"),
        (name = "dashboard", description = "Headline numbers"),
        (name = "integrations", description = "Provider credentials"),
        (name = "asaas", description = "Asaas boletos and webhook"),
        (name = "mercadopago", description = "Mercado Pago payments"),
        (name = "nfe", description = "NF-e through Focus NFe"),
        (name = "email", description = "Transactional e-mail"),
        (name = "health", description = "Health checks")
    ),
    paths(
        crate::auth::login_handler,
        handlers::company::get_company,
        handlers::company::update_company,
        handlers::users::list_users,
        handlers::users::create_user,
        handlers::users::update_user,
        handlers::customers::list_customers,
        handlers::customers::create_customer,
        handlers::customers::get_customer,
        handlers::customers::update_customer,
        handlers::customers::delete_customer,
        handlers::customers::get_customer_overdue,
        handlers::suppliers::list_suppliers,
        handlers::suppliers::create_supplier,
        handlers::suppliers::get_supplier,
        handlers::suppliers::update_supplier,
        handlers::suppliers::delete_supplier,
        handlers::products::list_products,
        handlers::products::low_stock_products,
        handlers::products::create_product,
        handlers::products::get_product,
        handlers::products::update_product,
        handlers::products::delete_product,
        handlers::payment_methods::list_payment_methods,
        handlers::payment_methods::create_payment_method,
        handlers::payment_methods::update_payment_method,
        handlers::payment_methods::delete_payment_method,
        handlers::orders::list_orders,
        handlers::orders::create_order,
        handlers::orders::get_order,
        handlers::orders::update_order_status,
        handlers::orders::delete_order,
        handlers::financial::list_records,
        handlers::financial::create_record,
        handlers::financial::get_record,
        handlers::financial::update_record,
        handlers::financial::delete_record,
        handlers::financial::pay_record,
        handlers::financial::refresh_overdue,
        handlers::financial::send_boleto,
        handlers::equipment::list_loans,
        handlers::equipment::create_loan,
        handlers::equipment::get_loan,
        handlers::equipment::register_return,
        handlers::equipment::list_returns,
        handlers::notifications::list_notifications,
        handlers::notifications::mark_read,
        handlers::notifications::mark_all_read,
        handlers::dashboard::summary,
        handlers::integrations::list_integrations,
        handlers::integrations::upsert_integration,
        handlers::asaas::sync_customer,
        handlers::asaas::create_boleto,
        handlers::asaas::asaas_webhook,
        handlers::mercadopago::create_payment,
        handlers::nfe::list_invoices,
        handlers::nfe::emit_invoice,
        handlers::nfe::get_invoice,
        handlers::nfe::cancel_invoice,
        handlers::nfe::invoice_files,
        handlers::email::send_email,
        handlers::health::health,
        handlers::health::liveness,
    ),
    components(
        schemas(
            crate::errors::ErrorResponse,
            crate::entities::user::Role,
            crate::entities::company_integration::Provider,
            crate::entities::financial_record::FinancialStatus,
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::builder().scheme(HttpAuthScheme::Bearer).bearer_format("JWT").build()),
        );
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_routes_and_bearer_scheme() {
        let json = serde_json::to_string(&ApiDoc::openapi()).unwrap();
        assert!(json.contains("Distribuidora API"));
        assert!(json.contains("/api/customers/{id}/overdue"));
        assert!(json.contains("/api/asaas/webhook"));
        assert!(json.contains("/api/nfe/{id}/cancel"));
        assert!(json.contains("bearer_auth"));
    }

    #[test]
    fn webhook_documents_its_request_body() {
        let doc = serde_json::to_value(ApiDoc::openapi()).unwrap();
        let body = &doc["paths"]["/api/asaas/webhook"]["post"]["requestBody"];
        assert!(body["content"]["application/json"]["schema"].is_object());
    }
}
