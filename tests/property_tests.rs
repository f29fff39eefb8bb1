//! Property-based tests for document validation and status rules.
//!
//! Generated CPFs/CNPJs get their check digits from the same mod-11 routine the
//! validators use, so the properties check the validators rather than the generator.

use distribuidora_api::documents::{
    classify_phone, cnpj_check_digits, cpf_check_digits, document_kind, is_valid_cnpj,
    is_valid_cpf, is_valid_document, only_digits, DocumentKind, PhoneKind,
};
use distribuidora_api::entities::equipment_loan::LoanStatus;
use distribuidora_api::entities::order::OrderStatus;
use proptest::prelude::*;

fn render(digits: &[u32]) -> String {
    digits.iter().map(|d| char::from_digit(*d, 10).unwrap()).collect()
}

fn not_all_equal(digits: &[u32]) -> bool {
    digits.windows(2).any(|w| w[0] != w[1])
}

fn cpf_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(0u32..10, 9)
        .prop_filter("repeated digits are never valid", |base| not_all_equal(base))
        .prop_map(|mut base| {
            let (first, second) = cpf_check_digits(&base);
            base.push(first);
            base.push(second);
            render(&base)
        })
}

fn cnpj_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(0u32..10, 12)
        .prop_filter("repeated digits are never valid", |base| not_all_equal(base))
        .prop_map(|mut base| {
            let (first, second) = cnpj_check_digits(&base);
            base.push(first);
            base.push(second);
            render(&base)
        })
}

fn format_cpf(cpf: &str) -> String {
    format!("{}.{}.{}-{}", &cpf[0..3], &cpf[3..6], &cpf[6..9], &cpf[9..11])
}

fn format_cnpj(cnpj: &str) -> String {
    format!(
        "{}.{}.{}/{}-{}",
        &cnpj[0..2],
        &cnpj[2..5],
        &cnpj[5..8],
        &cnpj[8..12],
        &cnpj[12..14]
    )
}

fn bump_digit(document: &str, position: usize, delta: u32) -> String {
    document
        .chars()
        .enumerate()
        .map(|(i, c)| {
            if i == position {
                let d = c.to_digit(10).unwrap();
                char::from_digit((d + delta) % 10, 10).unwrap()
            } else {
                c
            }
        })
        .collect()
}

fn order_status_strategy() -> impl Strategy<Value = OrderStatus> {
    prop_oneof![
        Just(OrderStatus::Pending),
        Just(OrderStatus::Confirmed),
        Just(OrderStatus::Delivered),
        Just(OrderStatus::Cancelled),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn generated_cpfs_are_valid_with_or_without_mask(cpf in cpf_strategy()) {
        prop_assert!(is_valid_cpf(&cpf), "CPF rejected: {}", cpf);
        prop_assert!(is_valid_cpf(&format_cpf(&cpf)));
        prop_assert!(is_valid_document(&cpf));
        prop_assert_eq!(document_kind(&format_cpf(&cpf)), Some(DocumentKind::Cpf));
    }

    #[test]
    fn generated_cnpjs_are_valid_with_or_without_mask(cnpj in cnpj_strategy()) {
        prop_assert!(is_valid_cnpj(&cnpj), "CNPJ rejected: {}", cnpj);
        prop_assert!(is_valid_cnpj(&format_cnpj(&cnpj)));
        prop_assert!(is_valid_document(&cnpj));
        prop_assert_eq!(document_kind(&cnpj), Some(DocumentKind::Cnpj));
    }

    #[test]
    fn altering_a_check_digit_invalidates_a_cpf(
        cpf in cpf_strategy(),
        position in 9usize..11,
        delta in 1u32..10,
    ) {
        let tampered = bump_digit(&cpf, position, delta);
        prop_assert!(!is_valid_cpf(&tampered), "tampered CPF accepted: {}", tampered);
    }

    #[test]
    fn altering_a_check_digit_invalidates_a_cnpj(
        cnpj in cnpj_strategy(),
        position in 12usize..14,
        delta in 1u32..10,
    ) {
        let tampered = bump_digit(&cnpj, position, delta);
        prop_assert!(!is_valid_cnpj(&tampered), "tampered CNPJ accepted: {}", tampered);
    }

    #[test]
    fn documents_of_other_lengths_are_invalid(digits in "[0-9]{1,20}") {
        prop_assume!(digits.len() != 11 && digits.len() != 14);
        prop_assert!(!is_valid_document(&digits));
        prop_assert_eq!(document_kind(&digits), None);
    }

    #[test]
    fn only_digits_keeps_exactly_the_ascii_digits(s in ".{0,40}") {
        let digits = only_digits(&s);
        prop_assert!(digits.chars().all(|c| c.is_ascii_digit()));
        prop_assert_eq!(digits.len(), s.chars().filter(|c| c.is_ascii_digit()).count());
    }

    #[test]
    fn phones_with_country_code_normalize_like_local_ones(
        area in 11u32..100,
        number in 10_000_000u32..100_000_000,
    ) {
        let landline = format!("{}{}", area, number);
        prop_assert_eq!(classify_phone(&landline), PhoneKind::Landline(landline.clone()));
        prop_assert_eq!(classify_phone(&format!("+55 ({}) {}", area, number)), PhoneKind::Landline(landline.clone()));

        let mobile = format!("{}9{}", area, number);
        prop_assert_eq!(classify_phone(&format!("55{}", mobile)), PhoneKind::Mobile(mobile.clone()));
    }

    #[test]
    fn loan_status_follows_returned_quantity(quantity in 1i32..1000, returned in 0i32..1000) {
        prop_assume!(returned <= quantity);
        let status = LoanStatus::for_quantities(quantity, returned);
        let expected = if returned == 0 {
            LoanStatus::Active
        } else if returned == quantity {
            LoanStatus::Returned
        } else {
            LoanStatus::PartiallyReturned
        };
        prop_assert_eq!(status, expected);
    }

    #[test]
    fn finished_orders_never_transition(next in order_status_strategy()) {
        prop_assert!(!OrderStatus::Delivered.can_transition_to(next));
        prop_assert!(!OrderStatus::Cancelled.can_transition_to(next));
    }

    #[test]
    fn no_order_status_transitions_to_itself(status in order_status_strategy()) {
        prop_assert!(!status.can_transition_to(status));
    }
}
