//! # Códigos de Estado
//! src/api/status.rs
//!
//! Códigos HTTP que la capa de API devuelve al cliente:
//!
//! - **2xx**: 200 (consulta), 202 (job aceptado)
//! - **4xx**: 400 (request inválido), 404 (job o artefacto ausente),
//!   409 (job todavía no terminal)
//! - **5xx**: 500 (artefacto malformado o falla interna)

/// Códigos de estado que usa la API de cuentos
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK
    Ok = 200,

    /// 202 Accepted - Job encolado, se ejecuta en background
    Accepted = 202,

    /// 400 Bad Request - Payload inválido
    BadRequest = 400,

    /// 404 Not Found - Job, run directory o artefacto inexistente
    NotFound = 404,

    /// 409 Conflict - El job aún no llegó a un estado con resultado
    Conflict = 409,

    /// 500 Internal Server Error
    InternalServerError = 500,
}

impl StatusCode {
    /// Valor numérico del código
    ///
    /// # Ejemplo
    /// ```
    /// use story_jobs::api::StatusCode;
    /// assert_eq!(StatusCode::Accepted.as_u16(), 202);
    /// ```
    pub fn as_u16(&self) -> u16 {
        *self as u16
    }

    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::Accepted => "Accepted",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::NotFound => "Not Found",
            StatusCode::Conflict => "Conflict",
            StatusCode::InternalServerError => "Internal Server Error",
        }
    }

    /// Verifica si el código indica éxito (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.as_u16())
    }

    /// Verifica si el código indica error del cliente (4xx)
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.as_u16())
    }

    /// Verifica si el código indica error del servidor (5xx)
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.as_u16())
    }
}

impl std::fmt::Display for StatusCode {
    /// Formato: "202 Accepted"
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.reason_phrase())
    }
}
