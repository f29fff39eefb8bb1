//! Brazilian document (CPF/CNPJ) validation and phone normalization.

use serde::Serialize;

/// Strips every non-digit character.
pub fn only_digits(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}

fn digits_of(value: &str) -> Vec<u32> {
    value.chars().filter_map(|c| c.to_digit(10)).collect()
}

fn all_equal(digits: &[u32]) -> bool {
    digits.windows(2).all(|w| w[0] == w[1])
}

fn mod11_check_digit(digits: &[u32], weights: &[u32]) -> u32 {
    let sum: u32 = digits.iter().zip(weights).map(|(d, w)| d * w).sum();
    let remainder = sum % 11;
    if remainder < 2 {
        0
    } else {
        11 - remainder
    }
}

/// Check digits for the first nine CPF digits.
pub fn cpf_check_digits(base: &[u32]) -> (u32, u32) {
    let first = mod11_check_digit(base, &[10, 9, 8, 7, 6, 5, 4, 3, 2]);
    let mut with_first = base.to_vec();
    with_first.push(first);
    let second = mod11_check_digit(&with_first, &[11, 10, 9, 8, 7, 6, 5, 4, 3, 2]);
    (first, second)
}

/// Check digits for the first twelve CNPJ digits.
pub fn cnpj_check_digits(base: &[u32]) -> (u32, u32) {
    let first = mod11_check_digit(base, &[5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2]);
    let mut with_first = base.to_vec();
    with_first.push(first);
    let second = mod11_check_digit(&with_first, &[6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2]);
    (first, second)
}

pub fn is_valid_cpf(value: &str) -> bool {
    let digits = digits_of(value);
    if digits.len() != 11 || all_equal(&digits) {
        return false;
    }
    let (first, second) = cpf_check_digits(&digits[..9]);
    digits[9] == first && digits[10] == second
}

pub fn is_valid_cnpj(value: &str) -> bool {
    let digits = digits_of(value);
    if digits.len() != 14 || all_equal(&digits) {
        return false;
    }
    let (first, second) = cnpj_check_digits(&digits[..12]);
    digits[12] == first && digits[13] == second
}

/// CPF for 11 digits, CNPJ for 14, anything else is invalid.
pub fn is_valid_document(value: &str) -> bool {
    match only_digits(value).len() {
        11 => is_valid_cpf(value),
        14 => is_valid_cnpj(value),
        _ => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Cpf,
    Cnpj,
}

pub fn document_kind(value: &str) -> Option<DocumentKind> {
    match only_digits(value).len() {
        11 => Some(DocumentKind::Cpf),
        14 => Some(DocumentKind::Cnpj),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhoneKind {
    /// 11 digits: area code plus a 9-digit mobile number
    Mobile(String),
    /// 10 digits: area code plus an 8-digit landline
    Landline(String),
    Invalid,
}

/// Normalizes a Brazilian phone number and tells mobile from landline.
pub fn classify_phone(value: &str) -> PhoneKind {
    let mut digits = only_digits(value);
    if (digits.len() == 12 || digits.len() == 13) && digits.starts_with("55") {
        digits = digits.split_off(2);
    }
    match digits.len() {
        11 => PhoneKind::Mobile(digits),
        10 => PhoneKind::Landline(digits),
        _ => PhoneKind::Invalid,
    }
}

/// `validator` hook for optional CPF/CNPJ fields.
pub fn validate_document_field(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() || is_valid_document(value) {
        Ok(())
    } else {
        let mut err = validator::ValidationError::new("document");
        err.message = Some("CPF/CNPJ inválido".into());
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("529.982.247-25", true)]
    #[case("52998224725", true)]
    #[case("111.444.777-35", true)]
    #[case("529.982.247-24", false)]
    #[case("111.111.111-11", false)]
    #[case("1234567890", false)]
    fn cpf_validation(#[case] input: &str, #[case] valid: bool) {
        assert_eq!(is_valid_cpf(input), valid);
    }

    #[rstest]
    #[case("11.222.333/0001-81", true)]
    #[case("11222333000181", true)]
    #[case("11.222.333/0001-80", false)]
    #[case("00.000.000/0000-00", false)]
    fn cnpj_validation(#[case] input: &str, #[case] valid: bool) {
        assert_eq!(is_valid_cnpj(input), valid);
    }

    #[test]
    fn document_dispatches_on_length() {
        assert!(is_valid_document("529.982.247-25"));
        assert!(is_valid_document("11.222.333/0001-81"));
        assert!(!is_valid_document("123"));
        assert_eq!(document_kind("11222333000181"), Some(DocumentKind::Cnpj));
    }

    #[rstest]
    #[case("(11) 98765-4321", PhoneKind::Mobile("11987654321".into()))]
    #[case("+55 11 98765-4321", PhoneKind::Mobile("11987654321".into()))]
    #[case("(11) 3456-7890", PhoneKind::Landline("1134567890".into()))]
    #[case("551134567890", PhoneKind::Landline("1134567890".into()))]
    #[case("98765-4321", PhoneKind::Invalid)]
    #[case("", PhoneKind::Invalid)]
    fn phone_classification(#[case] input: &str, #[case] expected: PhoneKind) {
        assert_eq!(classify_phone(input), expected);
    }

    #[test]
    fn empty_document_field_is_accepted() {
        assert!(validate_document_field("").is_ok());
        assert!(validate_document_field("123.456.789-00").is_err());
    }
}
