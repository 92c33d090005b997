use thiserror::Error;

use crate::domain::commission::BatchStatus;
use crate::domain::renewal::RenewalStatus;
use crate::domain::sales::OpportunityStage;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid renewal transition from {from:?} to {to:?}")]
    InvalidRenewalTransition { from: RenewalStatus, to: RenewalStatus },
    #[error("invalid batch transition from {from:?} to {to:?}")]
    InvalidBatchTransition { from: BatchStatus, to: BatchStatus },
    #[error("invalid opportunity transition from {from:?} to {to:?}")]
    InvalidStageTransition { from: OpportunityStage, to: OpportunityStage },
    #[error("discount code already redeemed")]
    CodeAlreadyRedeemed,
    #[error("discount code expired")]
    CodeExpired,
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "No se pudo procesar la solicitud. Verifica los datos e intenta de nuevo."
            }
            Self::ServiceUnavailable { .. } => {
                "El servicio no está disponible en este momento. Intenta de nuevo en unos minutos."
            }
            Self::Internal { .. } => "Ocurrió un error inesperado.",
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        match value {
            ApplicationError::Domain(_) => Self::BadRequest {
                message: "domain validation failed".to_owned(),
                correlation_id: "unassigned".to_owned(),
            },
            ApplicationError::Persistence(message) | ApplicationError::Integration(message) => {
                Self::ServiceUnavailable { message, correlation_id: "unassigned".to_owned() }
            }
            ApplicationError::Configuration(message) => {
                Self::Internal { message, correlation_id: "unassigned".to_owned() }
            }
        }
    }
}

/// Fixed taxonomy for errors coming back from the backing store or a
/// third-party call. Raw detail is logged; the UI only ever sees the
/// message mapped from the kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageErrorKind {
    UniqueViolation,
    ForeignKeyViolation,
    RequiredField,
    CheckViolation,
    Unauthorized,
    SessionExpired,
    RateLimited,
    Network,
    Storage,
    FileTooLarge,
    Unknown,
}

impl StorageErrorKind {
    pub fn user_message(self) -> &'static str {
        match self {
            Self::UniqueViolation => "Ya existe un registro con esos datos.",
            Self::ForeignKeyViolation => {
                "No se puede completar la operación: el registro está vinculado a otros datos."
            }
            Self::RequiredField => "Falta completar un campo obligatorio.",
            Self::CheckViolation => "Alguno de los valores ingresados no es válido.",
            Self::Unauthorized => "No tienes permisos para realizar esta acción.",
            Self::SessionExpired => "Tu sesión expiró. Vuelve a iniciar sesión.",
            Self::RateLimited => "Demasiadas solicitudes. Espera un momento e intenta de nuevo.",
            Self::Network => "Error de conexión. Revisa tu red e intenta de nuevo.",
            Self::Storage => "No se pudo acceder al archivo solicitado.",
            Self::FileTooLarge => "El archivo supera el tamaño máximo permitido.",
            Self::Unknown => "Ocurrió un error inesperado.",
        }
    }
}

/// Classify a raw error string into the fixed taxonomy by code/substring
/// matching. Matching order matters: the more specific patterns come first.
pub fn classify_storage_error(raw: &str) -> StorageErrorKind {
    let lowered = raw.to_ascii_lowercase();

    if lowered.contains("unique constraint") || lowered.contains("duplicate key") {
        return StorageErrorKind::UniqueViolation;
    }
    if lowered.contains("foreign key constraint") {
        return StorageErrorKind::ForeignKeyViolation;
    }
    if lowered.contains("not null constraint") || lowered.contains("null value in column") {
        return StorageErrorKind::RequiredField;
    }
    if lowered.contains("check constraint") {
        return StorageErrorKind::CheckViolation;
    }
    if lowered.contains("jwt expired") || lowered.contains("session expired") {
        return StorageErrorKind::SessionExpired;
    }
    if lowered.contains("row-level security")
        || lowered.contains("permission denied")
        || lowered.contains("unauthorized")
        || lowered.contains("401")
        || lowered.contains("403")
    {
        return StorageErrorKind::Unauthorized;
    }
    if lowered.contains("rate limit") || lowered.contains("too many requests") || lowered.contains("429") {
        return StorageErrorKind::RateLimited;
    }
    if lowered.contains("payload too large")
        || lowered.contains("maximum allowed size")
        || lowered.contains("413")
    {
        return StorageErrorKind::FileTooLarge;
    }
    if lowered.contains("bucket") || lowered.contains("object not found") {
        return StorageErrorKind::Storage;
    }
    if lowered.contains("connection")
        || lowered.contains("timed out")
        || lowered.contains("timeout")
        || lowered.contains("network")
        || lowered.contains("dns")
    {
        return StorageErrorKind::Network;
    }

    StorageErrorKind::Unknown
}

#[cfg(test)]
mod tests {
    use super::{
        classify_storage_error, ApplicationError, DomainError, InterfaceError, StorageErrorKind,
    };

    #[test]
    fn domain_error_maps_to_bad_request_interface_error() {
        let interface = ApplicationError::from(DomainError::InvariantViolation(
            "missing required field".to_owned(),
        ))
        .into_interface("req-1");

        assert!(matches!(
            interface,
            InterfaceError::BadRequest {
                ref correlation_id,
                ..
            } if correlation_id == "req-1"
        ));
    }

    #[test]
    fn persistence_error_maps_to_service_unavailable() {
        let interface =
            ApplicationError::Persistence("database lock timeout".to_owned()).into_interface("req-2");

        assert!(matches!(interface, InterfaceError::ServiceUnavailable { .. }));
        assert_eq!(
            interface.user_message(),
            "El servicio no está disponible en este momento. Intenta de nuevo en unos minutos."
        );
    }

    #[test]
    fn classification_covers_constraint_violations() {
        assert_eq!(
            classify_storage_error("UNIQUE constraint failed: client.email"),
            StorageErrorKind::UniqueViolation
        );
        assert_eq!(
            classify_storage_error("FOREIGN KEY constraint failed"),
            StorageErrorKind::ForeignKeyViolation
        );
        assert_eq!(
            classify_storage_error("NOT NULL constraint failed: policy.annual_premium"),
            StorageErrorKind::RequiredField
        );
        assert_eq!(
            classify_storage_error("CHECK constraint failed: premium_non_negative"),
            StorageErrorKind::CheckViolation
        );
    }

    #[test]
    fn classification_covers_auth_and_limits() {
        assert_eq!(
            classify_storage_error("new row violates row-level security policy"),
            StorageErrorKind::Unauthorized
        );
        assert_eq!(classify_storage_error("JWT expired"), StorageErrorKind::SessionExpired);
        assert_eq!(
            classify_storage_error("429 Too Many Requests"),
            StorageErrorKind::RateLimited
        );
        assert_eq!(
            classify_storage_error("Payload too large: exceeds maximum allowed size"),
            StorageErrorKind::FileTooLarge
        );
    }

    #[test]
    fn classification_falls_back_to_unknown() {
        assert_eq!(classify_storage_error("something odd happened"), StorageErrorKind::Unknown);
    }

    #[test]
    fn every_kind_has_a_spanish_message() {
        // Session-expiry wording must tell the operator to sign in again.
        assert!(StorageErrorKind::SessionExpired.user_message().contains("sesión"));
        assert!(StorageErrorKind::UniqueViolation.user_message().contains("Ya existe"));
    }
}
