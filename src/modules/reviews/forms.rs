//! Typed form inputs and their validation.
//!
//! Each form runs per-field checks first (presence, range, format) and then
//! its cross-field rules. A cross-field rule only runs when the fields it
//! reads passed their own checks. All errors found are reported together.

use bookrev_db::models::{NewPublisher, PUBLISHER_NAME_MAX, RATING_MAX, RATING_MIN};
use bookrev_http::error::AppError;
use serde::{Deserialize, Serialize, Serializer};

use crate::utils::non_blank;

pub const QUANTITY_MIN: i64 = 0;
pub const QUANTITY_MAX: i64 = 100;
/// Upper bound on the combined order quantity.
pub const ORDER_TOTAL_MAX: i64 = 100;
pub const USERNAME_MAX: usize = 150;

const REQUIRED: &str = "This field is required.";
const INVALID_EMAIL: &str = "Enter a valid email address.";
const INVALID_URL: &str = "Enter a valid URL.";

/// Where a validation error attaches: one input, or the submission as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorTarget {
    Field(&'static str),
    Form,
}

impl ErrorTarget {
    pub fn field_name(self) -> Option<&'static str> {
        match self {
            ErrorTarget::Field(name) => Some(name),
            ErrorTarget::Form => None,
        }
    }
}

impl Serialize for ErrorTarget {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.field_name().serialize(serializer)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    #[serde(rename = "field")]
    pub target: ErrorTarget,
    #[serde(rename = "error")]
    pub message: String,
}

impl ValidationError {
    pub fn field(name: &'static str, message: impl Into<String>) -> Self {
        Self {
            target: ErrorTarget::Field(name),
            message: message.into(),
        }
    }

    pub fn form(message: impl Into<String>) -> Self {
        Self {
            target: ErrorTarget::Form,
            message: message.into(),
        }
    }
}

/// Every error collected while cleaning one submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, thiserror::Error)]
#[error("{} validation error(s)", .0.len())]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: ValidationError) {
        self.0.push(error);
    }

    /// Record the error of a failed rule, if any.
    pub fn check(&mut self, outcome: Result<(), ValidationError>) {
        if let Err(error) = outcome {
            self.push(error);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.0
    }

    pub fn for_field(&self, name: &str) -> Vec<&str> {
        self.0
            .iter()
            .filter(|e| e.target.field_name() == Some(name))
            .map(|e| e.message.as_str())
            .collect()
    }

    pub fn non_field(&self) -> Vec<&str> {
        self.0
            .iter()
            .filter(|e| e.target == ErrorTarget::Form)
            .map(|e| e.message.as_str())
            .collect()
    }

    /// `Ok(value)` when nothing was recorded.
    pub fn finish<T>(self, value: impl FnOnce() -> T) -> Result<T, Self> {
        if self.is_empty() {
            Ok(value())
        } else {
            Err(self)
        }
    }
}

impl From<ValidationError> for ValidationErrors {
    fn from(error: ValidationError) -> Self {
        Self(vec![error])
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let details = errors
            .0
            .iter()
            .map(|e| serde_json::to_value(e).unwrap_or_default())
            .collect();
        AppError::validation(details, "Invalid form submission")
    }
}

// ---------------------------------------------------------------------------
// Cross-field rules
// ---------------------------------------------------------------------------

/// Signing up for the newsletter requires an email address.
pub fn validate_newsletter_signup(signup: bool, email: Option<&str>) -> Result<(), ValidationError> {
    let has_email = email.is_some_and(|e| !e.trim().is_empty());
    if signup && !has_email {
        return Err(ValidationError::field(
            "email",
            "Email is required when signing up for the newsletter.",
        ));
    }
    Ok(())
}

/// The two item quantities together may not exceed [`ORDER_TOTAL_MAX`].
pub fn validate_order_quantities(item_a: i64, item_b: i64) -> Result<(), ValidationError> {
    // Widened so any pair of inputs sums without overflow.
    let total = i128::from(item_a) + i128::from(item_b);
    if total > i128::from(ORDER_TOTAL_MAX) {
        return Err(ValidationError::form(format!(
            "The total quantity of Item A ({}) and Item B ({}) is {}, which exceeds the maximum allowed total of {}.",
            item_a, item_b, total, ORDER_TOTAL_MAX
        )));
    }
    Ok(())
}

/// Supplying an email requires the confirmation box to be checked.
pub fn validate_order_confirmation(
    email: Option<&str>,
    confirmed: bool,
) -> Result<(), ValidationError> {
    let has_email = email.is_some_and(|e| !e.trim().is_empty());
    if has_email && !confirmed {
        return Err(ValidationError::form(
            "please check the box before providing an email",
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Field checks
// ---------------------------------------------------------------------------

fn required_int(
    errors: &mut ValidationErrors,
    field: &'static str,
    value: Option<i64>,
    min: i64,
    max: i64,
) -> Option<i64> {
    let Some(value) = value else {
        errors.push(ValidationError::field(field, REQUIRED));
        return None;
    };
    if value < min {
        errors.push(ValidationError::field(
            field,
            format!("Ensure this value is greater than or equal to {}.", min),
        ));
        return None;
    }
    if value > max {
        errors.push(ValidationError::field(
            field,
            format!("Ensure this value is less than or equal to {}.", max),
        ));
        return None;
    }
    Some(value)
}

fn text(
    errors: &mut ValidationErrors,
    field: &'static str,
    value: Option<String>,
    required: bool,
    max_chars: usize,
) -> Option<String> {
    let Some(value) = non_blank(value) else {
        if required {
            errors.push(ValidationError::field(field, REQUIRED));
        }
        return None;
    };
    let length = value.chars().count();
    if length > max_chars {
        errors.push(ValidationError::field(
            field,
            format!(
                "Ensure this value has at most {} characters (it has {}).",
                max_chars, length
            ),
        ));
        return None;
    }
    Some(value)
}

fn email(
    errors: &mut ValidationErrors,
    field: &'static str,
    value: Option<String>,
    required: bool,
) -> Option<String> {
    let value = text(errors, field, value, required, 254)?;
    if !is_valid_email(&value) {
        errors.push(ValidationError::field(field, INVALID_EMAIL));
        return None;
    }
    Some(value)
}

fn url(
    errors: &mut ValidationErrors,
    field: &'static str,
    value: Option<String>,
    required: bool,
) -> Option<String> {
    let value = text(errors, field, value, required, 200)?;
    if !is_valid_url(&value) {
        errors.push(ValidationError::field(field, INVALID_URL));
        return None;
    }
    Some(value)
}

pub fn is_valid_email(value: &str) -> bool {
    let Some((local, domain)) = value.rsplit_once('@') else {
        return false;
    };
    if local.is_empty() || local.chars().any(|c| c.is_whitespace() || c == '@') {
        return false;
    }
    is_valid_host(domain) && domain.contains('.')
}

pub fn is_valid_url(value: &str) -> bool {
    let Some((scheme, rest)) = value.split_once("://") else {
        return false;
    };
    if !["http", "https", "ftp", "ftps"]
        .iter()
        .any(|s| s.eq_ignore_ascii_case(scheme))
    {
        return false;
    }
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host = match authority.rsplit_once(':') {
        Some((host, port)) if !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()) => {
            host
        }
        _ => authority,
    };
    host.eq_ignore_ascii_case("localhost") || (is_valid_host(host) && host.contains('.'))
}

fn is_valid_host(host: &str) -> bool {
    !host.is_empty()
        && host.split('.').all(|label| {
            !label.is_empty()
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_alphanumeric() || c == '-')
        })
}

// ---------------------------------------------------------------------------
// Forms
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewsletterForm {
    #[serde(default)]
    pub signup: bool,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewsletterSignup {
    pub signup: bool,
    pub email: Option<String>,
}

impl NewsletterForm {
    pub fn clean(self) -> Result<NewsletterSignup, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let email_supplied = non_blank(self.email.clone()).is_some();
        let email = email(&mut errors, "email", self.email, false);

        // A malformed address already carries its own error.
        if errors.is_empty() || !email_supplied {
            errors.check(validate_newsletter_signup(self.signup, email.as_deref()));
        }

        let signup = self.signup;
        errors.finish(|| NewsletterSignup { signup, email })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderForm {
    #[serde(default)]
    pub item_a: Option<i64>,
    #[serde(default)]
    pub item_b: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrderTotal {
    pub item_a: i64,
    pub item_b: i64,
    pub total_sum: i64,
}

impl OrderForm {
    pub fn clean(self) -> Result<OrderTotal, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let item_a = required_int(&mut errors, "item_a", self.item_a, QUANTITY_MIN, QUANTITY_MAX);
        let item_b = required_int(&mut errors, "item_b", self.item_b, QUANTITY_MIN, QUANTITY_MAX);

        let (Some(item_a), Some(item_b)) = (item_a, item_b) else {
            return Err(errors);
        };
        errors.check(validate_order_quantities(item_a, item_b));

        errors.finish(|| OrderTotal {
            item_a,
            item_b,
            total_sum: item_a + item_b,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderConfirmationForm {
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub signup: bool,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfirmedOrder {
    pub quantity: i64,
    pub email: Option<String>,
}

impl OrderConfirmationForm {
    pub fn clean(self) -> Result<ConfirmedOrder, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let quantity = required_int(
            &mut errors,
            "quantity",
            self.quantity,
            QUANTITY_MIN,
            QUANTITY_MAX,
        );
        let email = email(&mut errors, "email", self.email, false);

        errors.check(validate_order_confirmation(email.as_deref(), self.signup));

        match quantity {
            Some(quantity) => errors.finish(|| ConfirmedOrder { quantity, email }),
            None => Err(errors),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PublisherForm {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl PublisherForm {
    pub fn clean(self) -> Result<NewPublisher, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let name = text(&mut errors, "name", self.name, true, PUBLISHER_NAME_MAX);
        let website = url(&mut errors, "website", self.website, true);
        let email = email(&mut errors, "email", self.email, true);

        match (name, website, email) {
            (Some(name), Some(website), Some(email)) => errors.finish(|| NewPublisher {
                name,
                website,
                email,
            }),
            _ => Err(errors),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewForm {
    #[serde(default)]
    pub rating: Option<i64>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub creator_email: Option<String>,
    #[serde(default)]
    pub creator_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewSubmission {
    pub rating: u8,
    pub content: String,
    pub creator_email: String,
    pub creator_name: String,
}

impl ReviewForm {
    pub fn clean(self) -> Result<ReviewSubmission, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let rating = required_int(
            &mut errors,
            "rating",
            self.rating,
            i64::from(RATING_MIN),
            i64::from(RATING_MAX),
        );
        let content = self.content.unwrap_or_default();
        let creator_email = email(&mut errors, "creator_email", self.creator_email, true);
        let creator_name = text(
            &mut errors,
            "creator_name",
            self.creator_name,
            false,
            USERNAME_MAX,
        );

        match (rating.and_then(|r| u8::try_from(r).ok()), creator_email) {
            (Some(rating), Some(creator_email)) => errors.finish(|| ReviewSubmission {
                rating,
                content,
                creator_name: creator_name.unwrap_or_else(|| creator_email.clone()),
                creator_email,
            }),
            _ => Err(errors),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newsletter_signup_without_email_flags_email_field() {
        let err = validate_newsletter_signup(true, None).unwrap_err();
        assert_eq!(err.target, ErrorTarget::Field("email"));
        assert_eq!(
            err.message,
            "Email is required when signing up for the newsletter."
        );
        assert!(validate_newsletter_signup(true, Some("  ")).is_err());
    }

    #[test]
    fn newsletter_rule_passes_otherwise() {
        assert!(validate_newsletter_signup(true, Some("a@b.com")).is_ok());
        assert!(validate_newsletter_signup(false, None).is_ok());
        assert!(validate_newsletter_signup(false, Some("a@b.com")).is_ok());
    }

    #[test]
    fn order_quantities_over_cap_is_form_error() {
        let err = validate_order_quantities(60, 50).unwrap_err();
        assert_eq!(err.target, ErrorTarget::Form);
        assert!(err.message.contains("(60)"));
        assert!(err.message.contains("(50)"));
        assert!(err.message.contains("is 110"));
    }

    #[test]
    fn order_quantities_cap_is_inclusive() {
        assert!(validate_order_quantities(50, 50).is_ok());
        assert!(validate_order_quantities(0, 0).is_ok());
        assert!(validate_order_quantities(100, 1).is_err());
    }

    #[test]
    fn order_quantities_at_integer_limits_do_not_overflow() {
        let err = validate_order_quantities(i64::MAX, 1).unwrap_err();
        assert!(err.message.contains("is 9223372036854775808"));
        assert!(validate_order_quantities(i64::MAX, i64::MAX).is_err());
        assert!(validate_order_quantities(i64::MIN, i64::MIN).is_ok());
    }

    #[test]
    fn order_confirmation_requires_checkbox_with_email() {
        let err = validate_order_confirmation(Some("a@b.com"), false).unwrap_err();
        assert_eq!(err.target, ErrorTarget::Form);
        assert!(validate_order_confirmation(Some("a@b.com"), true).is_ok());
        assert!(validate_order_confirmation(None, false).is_ok());
        assert!(validate_order_confirmation(Some(""), false).is_ok());
    }

    #[test]
    fn order_form_returns_total() {
        let total = OrderForm {
            item_a: Some(30),
            item_b: Some(70),
        }
        .clean()
        .unwrap();
        assert_eq!(total.total_sum, 100);
    }

    #[test]
    fn order_form_skips_sum_rule_when_a_field_fails() {
        let errors = OrderForm {
            item_a: Some(101),
            item_b: Some(50),
        }
        .clean()
        .unwrap_err();
        assert_eq!(
            errors.for_field("item_a"),
            vec!["Ensure this value is less than or equal to 100."]
        );
        assert!(errors.non_field().is_empty());

        let errors = OrderForm {
            item_a: None,
            item_b: Some(-1),
        }
        .clean()
        .unwrap_err();
        assert_eq!(errors.for_field("item_a"), vec![REQUIRED]);
        assert_eq!(
            errors.for_field("item_b"),
            vec!["Ensure this value is greater than or equal to 0."]
        );
    }

    #[test]
    fn newsletter_form_reports_single_email_error() {
        let errors = NewsletterForm {
            signup: true,
            email: Some("".into()),
        }
        .clean()
        .unwrap_err();
        assert_eq!(errors.errors().len(), 1);
        assert_eq!(errors.for_field("email").len(), 1);

        let errors = NewsletterForm {
            signup: true,
            email: Some("not-an-email".into()),
        }
        .clean()
        .unwrap_err();
        assert_eq!(errors.for_field("email"), vec![INVALID_EMAIL]);
    }

    #[test]
    fn newsletter_form_normalizes_blank_email() {
        let signup = NewsletterForm {
            signup: false,
            email: Some("   ".into()),
        }
        .clean()
        .unwrap();
        assert_eq!(signup.email, None);
    }

    #[test]
    fn confirmation_form_collects_field_and_form_errors() {
        let errors = OrderConfirmationForm {
            quantity: None,
            signup: false,
            email: Some("buyer@example.com".into()),
        }
        .clean()
        .unwrap_err();
        assert_eq!(errors.for_field("quantity"), vec![REQUIRED]);
        assert_eq!(
            errors.non_field(),
            vec!["please check the box before providing an email"]
        );
    }

    #[test]
    fn publisher_form_checks_each_field() {
        let errors = PublisherForm {
            name: Some("x".repeat(51)),
            website: Some("packtpub".into()),
            email: None,
        }
        .clean()
        .unwrap_err();
        assert_eq!(
            errors.for_field("name"),
            vec!["Ensure this value has at most 50 characters (it has 51)."]
        );
        assert_eq!(errors.for_field("website"), vec![INVALID_URL]);
        assert_eq!(errors.for_field("email"), vec![REQUIRED]);

        let publisher = PublisherForm {
            name: Some(" Packt ".into()),
            website: Some("https://www.packtpub.com/books".into()),
            email: Some("info@packtpub.com".into()),
        }
        .clean()
        .unwrap();
        assert_eq!(publisher.name, "Packt");
    }

    #[test]
    fn review_form_defaults_name_to_email() {
        let review = ReviewForm {
            rating: Some(4),
            content: None,
            creator_email: Some("reader@example.com".into()),
            creator_name: None,
        }
        .clean()
        .unwrap();
        assert_eq!(review.rating, 4);
        assert_eq!(review.creator_name, "reader@example.com");

        let errors = ReviewForm {
            rating: Some(6),
            ..ReviewForm::default()
        }
        .clean()
        .unwrap_err();
        assert_eq!(
            errors.for_field("rating"),
            vec!["Ensure this value is less than or equal to 5."]
        );
        assert_eq!(errors.for_field("creator_email"), vec![REQUIRED]);
    }

    #[test]
    fn email_and_url_formats() {
        assert!(is_valid_email("a@b.com"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("@b.com"));
        assert!(!is_valid_email("a b@c.com"));
        assert!(is_valid_url("http://localhost:8000/admin"));
        assert!(is_valid_url("https://example.org?x=1"));
        assert!(!is_valid_url("example.org"));
        assert!(!is_valid_url("mailto://example.org"));
    }

    #[test]
    fn errors_serialize_with_field_or_null() {
        let errors: ValidationErrors = ValidationError::form("too many").into();
        let app_error: AppError = errors.into();
        match app_error {
            AppError::Validation { details, .. } => {
                assert_eq!(details[0]["field"], serde_json::Value::Null);
                assert_eq!(details[0]["error"], "too many");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }
}
