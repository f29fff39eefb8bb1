//! Translation between local customers and Asaas customers.

use serde::Serialize;

use super::AsaasCustomer;
use crate::documents::{classify_phone, only_digits, PhoneKind};
use crate::entities::customer;

/// Body for `POST /customers`.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AsaasCustomerPayload {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpf_cnpj: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complement: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_reference: Option<String>,
}

/// Body for `POST /customers/{id}`; only changed fields are present.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AsaasCustomerUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpf_cnpj: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complement: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
}

impl AsaasCustomerUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn non_blank_digits(value: Option<&str>) -> Option<String> {
    value.map(only_digits).filter(|v| !v.is_empty())
}

pub fn map_to_asaas_customer(customer: &customer::Model) -> AsaasCustomerPayload {
    let document = non_blank_digits(customer.document.as_deref());
    let email = non_blank(customer.email.as_deref()).map(|e| e.to_lowercase());

    let name = non_blank(Some(&customer.name))
        .or_else(|| non_blank(customer.trade_name.as_deref()))
        .or_else(|| email.clone())
        .or_else(|| document.as_ref().map(|d| format!("Cliente {}", d)))
        .unwrap_or_else(|| "Cliente".to_string());

    let (phone, mobile_phone) = match customer.phone.as_deref().map(classify_phone) {
        Some(PhoneKind::Landline(digits)) => (Some(digits), None),
        Some(PhoneKind::Mobile(digits)) => (None, Some(digits)),
        _ => (None, None),
    };

    AsaasCustomerPayload {
        name,
        cpf_cnpj: document,
        email,
        phone,
        mobile_phone,
        postal_code: non_blank_digits(customer.postal_code.as_deref()),
        address: non_blank(customer.address.as_deref()),
        address_number: non_blank(customer.address_number.as_deref()),
        complement: non_blank(customer.complement.as_deref()),
        province: non_blank(customer.neighborhood.as_deref()),
        external_reference: Some(customer.id.to_string()),
    }
}

fn text_differs(current: Option<&str>, desired: &str) -> bool {
    current.map(str::trim).unwrap_or_default() != desired.trim()
}

fn email_differs(current: Option<&str>, desired: &str) -> bool {
    current.map(|c| c.trim().to_lowercase()).unwrap_or_default() != desired.trim().to_lowercase()
}

fn digits_differ(current: Option<&str>, desired: &str) -> bool {
    current.map(only_digits).unwrap_or_default() != only_digits(desired)
}

fn changed(
    current: Option<&str>,
    desired: Option<&String>,
    differs: fn(Option<&str>, &str) -> bool,
) -> Option<String> {
    desired.filter(|d| differs(current, d)).cloned()
}

/// Fields of `desired` that differ from what Asaas currently holds.
/// Absent desired values never clear remote data.
pub fn diff_customer(current: &AsaasCustomer, desired: &AsaasCustomerPayload) -> AsaasCustomerUpdate {
    AsaasCustomerUpdate {
        name: changed(current.name.as_deref(), Some(&desired.name), text_differs),
        email: changed(current.email.as_deref(), desired.email.as_ref(), email_differs),
        phone: changed(current.phone.as_deref(), desired.phone.as_ref(), digits_differ),
        mobile_phone: changed(
            current.mobile_phone.as_deref(),
            desired.mobile_phone.as_ref(),
            digits_differ,
        ),
        cpf_cnpj: changed(current.cpf_cnpj.as_deref(), desired.cpf_cnpj.as_ref(), digits_differ),
        postal_code: changed(
            current.postal_code.as_deref(),
            desired.postal_code.as_ref(),
            digits_differ,
        ),
        address: changed(current.address.as_deref(), desired.address.as_ref(), text_differs),
        address_number: changed(
            current.address_number.as_deref(),
            desired.address_number.as_ref(),
            text_differs,
        ),
        complement: changed(current.complement.as_deref(), desired.complement.as_ref(), text_differs),
        province: changed(current.province.as_deref(), desired.province.as_ref(), text_differs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;
    use uuid::Uuid;

    fn customer() -> customer::Model {
        customer::Model {
            id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            name: "Bar do Zé".into(),
            trade_name: None,
            document: Some("529.982.247-25".into()),
            email: Some("Ze@Bar.com.br".into()),
            phone: Some("(11) 98765-4321".into()),
            address: Some("Rua das Flores".into()),
            address_number: Some("100".into()),
            complement: None,
            neighborhood: Some("Centro".into()),
            city: Some("São Paulo".into()),
            state: Some("SP".into()),
            postal_code: Some("01310-100".into()),
            asaas_customer_id: None,
            credit_limit: None,
            active: true,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn as_remote(payload: &AsaasCustomerPayload) -> AsaasCustomer {
        AsaasCustomer {
            id: "cus_1".into(),
            name: Some(payload.name.clone()),
            email: payload.email.clone(),
            phone: payload.phone.clone(),
            mobile_phone: payload.mobile_phone.clone(),
            cpf_cnpj: payload.cpf_cnpj.clone(),
            postal_code: payload.postal_code.clone(),
            address: payload.address.clone(),
            address_number: payload.address_number.clone(),
            complement: payload.complement.clone(),
            province: payload.province.clone(),
            external_reference: payload.external_reference.clone(),
            deleted: false,
        }
    }

    #[test]
    fn maps_customer_fields() {
        let c = customer();
        let payload = map_to_asaas_customer(&c);
        assert_eq!(payload.name, "Bar do Zé");
        assert_eq!(payload.cpf_cnpj.as_deref(), Some("52998224725"));
        assert_eq!(payload.email.as_deref(), Some("ze@bar.com.br"));
        assert_eq!(payload.mobile_phone.as_deref(), Some("11987654321"));
        assert_eq!(payload.phone, None);
        assert_eq!(payload.postal_code.as_deref(), Some("01310100"));
        assert_eq!(payload.province.as_deref(), Some("Centro"));
        assert_eq!(payload.external_reference, Some(c.id.to_string()));
    }

    #[test]
    fn name_falls_back_to_trade_name_then_email_then_document() {
        let mut c = customer();
        c.name = "  ".into();
        c.trade_name = Some("Distribuidora Zé".into());
        assert_eq!(map_to_asaas_customer(&c).name, "Distribuidora Zé");

        c.trade_name = None;
        assert_eq!(map_to_asaas_customer(&c).name, "ze@bar.com.br");

        c.email = None;
        assert_eq!(map_to_asaas_customer(&c).name, "Cliente 52998224725");
    }

    #[test]
    fn landline_goes_to_phone_and_invalid_is_dropped() {
        let mut c = customer();
        c.phone = Some("(11) 3456-7890".into());
        let payload = map_to_asaas_customer(&c);
        assert_eq!(payload.phone.as_deref(), Some("1134567890"));
        assert_eq!(payload.mobile_phone, None);

        c.phone = Some("123".into());
        let payload = map_to_asaas_customer(&c);
        assert_eq!(payload.phone, None);
        assert_eq!(payload.mobile_phone, None);
    }

    #[test]
    fn diff_ignores_formatting_and_email_case() {
        let desired = map_to_asaas_customer(&customer());
        let mut remote = as_remote(&desired);
        remote.email = Some("ZE@BAR.COM.BR".into());
        remote.cpf_cnpj = Some("529.982.247-25".into());
        remote.mobile_phone = Some("(11) 98765-4321".into());
        remote.postal_code = Some("01310-100".into());
        assert!(diff_customer(&remote, &desired).is_empty());
    }

    #[test]
    fn diff_reports_only_changed_fields() {
        let desired = map_to_asaas_customer(&customer());
        let mut remote = as_remote(&desired);
        remote.address = Some("Rua Antiga".into());
        remote.email = None;

        let update = diff_customer(&remote, &desired);
        assert_eq!(update.address.as_deref(), Some("Rua das Flores"));
        assert_eq!(update.email.as_deref(), Some("ze@bar.com.br"));
        assert_eq!(update.name, None);
        assert_eq!(update.cpf_cnpj, None);
    }

    fn arb_customer() -> impl Strategy<Value = customer::Model> {
        (
            "[ a-zA-Z]{0,20}",
            proptest::option::of("[a-zA-Z ]{0,12}"),
            proptest::option::of("[0-9]{11}|[0-9]{14}"),
            proptest::option::of("[a-z]{1,8}@[a-z]{1,8}\\.com"),
            proptest::option::of("[0-9 ()+-]{0,16}"),
        )
            .prop_filter("needs a document or an email", |(_, _, doc, email, _)| {
                doc.is_some() || email.is_some()
            })
            .prop_map(|(name, trade_name, document, email, phone)| {
                let mut c = customer();
                c.name = name;
                c.trade_name = trade_name;
                c.document = document;
                c.email = email;
                c.phone = phone;
                c
            })
    }

    proptest! {
        #[test]
        fn mapped_name_is_never_empty(c in arb_customer()) {
            let payload = map_to_asaas_customer(&c);
            prop_assert!(!payload.name.trim().is_empty());
        }

        #[test]
        fn phone_fields_are_exclusive_and_sized(c in arb_customer()) {
            let payload = map_to_asaas_customer(&c);
            prop_assert!(!(payload.phone.is_some() && payload.mobile_phone.is_some()));
            if let Some(p) = &payload.phone {
                prop_assert_eq!(p.len(), 10);
            }
            if let Some(m) = &payload.mobile_phone {
                prop_assert_eq!(m.len(), 11);
            }
        }

        #[test]
        fn diff_against_own_projection_is_empty(c in arb_customer()) {
            let payload = map_to_asaas_customer(&c);
            prop_assert!(diff_customer(&as_remote(&payload), &payload).is_empty());
        }
    }
}
