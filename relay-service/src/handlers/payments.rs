//! Card payment pages: the payment form, checkout hand-off and verification
//! of a returning reference.

use askama::Template;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use serde_json::Value;
use service_core::error::AppError;
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{
    models::PaymentRecord,
    services::{gateway::to_minor, metrics::record_verification, StoreError},
    AppState,
};

const REFERENCE_ATTEMPTS: usize = 3;

/// Flash message carried across the verification redirect.
#[derive(Debug, Default, Deserialize)]
pub struct FlashQuery {
    pub message: Option<String>,
    pub level: Option<String>,
}

pub struct Flash {
    pub message: String,
    pub level: &'static str,
}

impl FlashQuery {
    fn into_flash(self) -> Option<Flash> {
        let message = self.message.filter(|m| !m.is_empty())?;
        let level = match self.level.as_deref() {
            Some("success") => "success",
            Some("error") => "error",
            _ => "info",
        };
        Some(Flash { message, level })
    }
}

#[derive(Template)]
#[template(path = "payment_form.html")]
pub struct PaymentFormTemplate {
    pub flash: Option<Flash>,
    pub errors: Vec<String>,
    pub email: String,
    pub amount: String,
}

#[derive(Template)]
#[template(path = "checkout.html")]
pub struct CheckoutTemplate {
    pub public_key: String,
    pub reference: String,
    pub email: String,
    pub amount: u64,
    pub amount_minor: u64,
    pub authorization_url: String,
}

/// Raw form fields; everything arrives as text.
#[derive(Debug, Default, Deserialize)]
pub struct PaymentForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub amount: String,
}

#[derive(Debug, Validate)]
pub struct PaymentIntent {
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
    #[validate(range(min = 1, message = "Amount must be at least 1"))]
    pub amount: u64,
}

impl TryFrom<&PaymentForm> for PaymentIntent {
    type Error = ValidationErrors;

    fn try_from(form: &PaymentForm) -> Result<Self, Self::Error> {
        let amount = form.amount.trim().parse::<u64>().map_err(|_| {
            let mut error = ValidationError::new("amount");
            error.message = Some("Amount must be a whole number".into());
            let mut errors = ValidationErrors::new();
            errors.add("amount", error);
            errors
        })?;

        let intent = Self {
            email: form.email.trim().to_string(),
            amount,
        };
        intent.validate()?;
        Ok(intent)
    }
}

fn error_messages(errors: &ValidationErrors) -> Vec<String> {
    let mut messages: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(message) => message.to_string(),
                None => format!("{} is invalid", field),
            })
        })
        .collect();
    messages.sort();
    messages
}

fn render<T: Template>(template: &T) -> Result<Html<String>, AppError> {
    template
        .render()
        .map(Html)
        .map_err(|e| AppError::InternalError(anyhow::anyhow!("Template error: {}", e)))
}

fn form_page(
    status: StatusCode,
    form: &PaymentForm,
    errors: Vec<String>,
) -> Result<Response, AppError> {
    let page = render(&PaymentFormTemplate {
        flash: None,
        errors,
        email: form.email.clone(),
        amount: form.amount.clone(),
    })?;
    Ok((status, page).into_response())
}

/// Redirect back to the form with a flash message.
fn flash_redirect(message: &str, level: &str) -> Redirect {
    let query = serde_urlencoded::to_string([("message", message), ("level", level)])
        .unwrap_or_default();
    Redirect::to(&format!("/initiate_payment?{}", query))
}

/// Render the empty payment form.
pub async fn payment_form(Query(flash): Query<FlashQuery>) -> Result<Html<String>, AppError> {
    render(&PaymentFormTemplate {
        flash: flash.into_flash(),
        errors: Vec::new(),
        email: String::new(),
        amount: String::new(),
    })
}

/// Validate the form, record the attempt and hand off to the gateway checkout.
///
/// Invalid input re-renders the form with 422. A gateway refusal re-renders it
/// with 502 and the gateway's message.
pub async fn initiate_payment(
    State(state): State<AppState>,
    Form(form): Form<PaymentForm>,
) -> Result<Response, AppError> {
    let intent = match PaymentIntent::try_from(&form) {
        Ok(intent) => intent,
        Err(errors) => {
            tracing::debug!(errors = %errors, "Rejected payment form");
            return form_page(StatusCode::UNPROCESSABLE_ENTITY, &form, error_messages(&errors));
        }
    };

    let Some(amount_minor) = to_minor(intent.amount) else {
        return form_page(
            StatusCode::UNPROCESSABLE_ENTITY,
            &form,
            vec!["Amount is too large".to_string()],
        );
    };

    let record = save_with_fresh_reference(&state, &intent).await?;

    tracing::info!(
        reference = %record.reference,
        amount = record.amount,
        "Payment initiated"
    );

    let response = state
        .charge
        .initialize_transaction(&record.email, record.amount, &record.reference)
        .await;

    let authorization_url = response
        .data
        .as_ref()
        .and_then(|d| d.get("authorization_url"))
        .and_then(Value::as_str)
        .map(str::to_string);

    let (true, Some(authorization_url)) = (response.success, authorization_url) else {
        tracing::warn!(
            reference = %record.reference,
            message = %response.message,
            "Checkout initialization failed"
        );
        let message = if response.message.is_empty() {
            "Payment gateway did not return a checkout page".to_string()
        } else {
            response.message
        };
        return form_page(StatusCode::BAD_GATEWAY, &form, vec![message]);
    };

    let page = render(&CheckoutTemplate {
        public_key: state.config.gateway.public_key.clone(),
        reference: record.reference.clone(),
        email: record.email.clone(),
        amount: record.amount,
        amount_minor,
        authorization_url,
    })?;

    Ok(page.into_response())
}

async fn save_with_fresh_reference(
    state: &AppState,
    intent: &PaymentIntent,
) -> Result<PaymentRecord, AppError> {
    for _ in 0..REFERENCE_ATTEMPTS {
        let record = PaymentRecord::new(
            Uuid::new_v4().simple().to_string(),
            intent.email.clone(),
            intent.amount,
        );
        match state.store.insert(record.clone()).await {
            Ok(()) => return Ok(record),
            Err(StoreError::Duplicate(reference)) => {
                tracing::warn!(reference = %reference, "Reference collision, retrying");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(AppError::InternalError(anyhow::anyhow!(
        "Could not allocate a unique payment reference"
    )))
}

/// Verify a returning payment reference and flash the outcome on the form.
pub async fn verify_payment(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> Result<Redirect, AppError> {
    let record = state
        .store
        .find_by_reference(&reference)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Payment reference not found")))?;

    if record.verified {
        return Ok(flash_redirect("Payment already verified", "success"));
    }

    let (verified, response) = state
        .charge
        .verify_payment(&reference, record.amount)
        .await;
    record_verification(verified);

    if verified {
        if !state.store.mark_verified(&reference).await? {
            tracing::warn!(reference = %reference, "Verified payment vanished from store");
            return Err(AppError::NotFound(anyhow::anyhow!(
                "Payment reference not found"
            )));
        }
        tracing::info!(reference = %reference, "Payment verified");
        Ok(flash_redirect("Verification successful", "success"))
    } else {
        tracing::warn!(
            reference = %reference,
            message = %response.message,
            "Payment verification failed"
        );
        Ok(flash_redirect("Verification failed", "error"))
    }
}
