//! Tenant-scoped business operations. Every public method takes the caller's
//! `company_id` and never reads or writes rows belonging to another company.

pub mod asaas_sync;
pub mod companies;
pub mod customers;
pub mod dashboard;
pub mod email;
pub mod equipment;
pub mod financial;
pub mod integrations;
pub mod invoices;
pub mod notifications;
pub mod orders;
pub mod payment_methods;
pub mod payments;
pub mod products;
pub mod suppliers;
pub mod users;

use serde::Serialize;
use utoipa::ToSchema;

/// One page of a listing plus the unpaged total.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
        }
    }
}

/// 1-based page request, already clamped by the handler layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub per_page: u64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 20,
        }
    }
}

/// Runs a select through sea-orm's paginator and wraps the result.
pub(crate) async fn paginate<E, C>(
    conn: &C,
    select: sea_orm::Select<E>,
    request: PageRequest,
) -> Result<Page<E::Model>, sea_orm::DbErr>
where
    E: sea_orm::EntityTrait,
    E::Model: Send + Sync,
    C: sea_orm::ConnectionTrait,
{
    use sea_orm::PaginatorTrait;

    let per_page = request.per_page.max(1);
    let paginator = select.paginate(conn, per_page);
    let total = paginator.num_items().await?;
    let items = paginator.fetch_page(request.page.saturating_sub(1)).await?;
    Ok(Page {
        items,
        total,
        page: request.page.max(1),
        per_page,
    })
}

/// Normalizes free text: trimmed, `None` when blank.
pub(crate) fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Lowercased, trimmed e-mail; `None` when blank.
pub(crate) fn clean_email(value: Option<String>) -> Option<String> {
    clean(value).map(|v| v.to_lowercase())
}

/// Digits-only document; `None` when blank.
pub(crate) fn clean_digits(value: Option<String>) -> Option<String> {
    value
        .map(|v| crate::documents::only_digits(&v))
        .filter(|v| !v.is_empty())
}

/// `%term%` for LIKE searches.
pub(crate) fn like_pattern(term: &str) -> String {
    format!("%{}%", term.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleaning_helpers() {
        assert_eq!(clean(Some("  ".into())), None);
        assert_eq!(clean(Some(" Centro ".into())).as_deref(), Some("Centro"));
        assert_eq!(clean_email(Some(" Ze@Bar.COM ".into())).as_deref(), Some("ze@bar.com"));
        assert_eq!(clean_digits(Some("01310-100".into())).as_deref(), Some("01310100"));
        assert_eq!(clean_digits(Some("--".into())), None);
    }
}
