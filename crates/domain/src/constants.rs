//! Application constants
//!
//! Centralized location for the resource names, cache keys and fallback
//! payload text used throughout the application.

// Resource names
pub const EXTERNAL_SERVICE: &str = "externalService";
pub const SLOW_SERVICE: &str = "miServicio";

// Fallback cache
pub const LAST_SUCCESSFUL_RESPONSE_KEY: &str = "lastSuccessfulResponse";
/// Payload field that marks an upstream body as an error report
pub const ERROR_FLAG_FIELD: &str = "error";

// Static fallback payload
pub const FALLBACK_STATIC_SOURCE: &str = "FALLBACK_STATIC";
pub const FALLBACK_STATIC_MESSAGE: &str = "Datos de respaldo (fallback estático)";
pub const FALLBACK_STATIC_NOTE: &str =
    "Este es un fallback estático porque el servicio externo no está disponible";
pub const FALLBACK_STATIC_VALUE1: &str = "Información de respaldo";
pub const FALLBACK_STATIC_VALUE2: i64 = 99999;
pub const FALLBACK_STATIC_STATUS: &str = "fallback";

// Configuration
pub const ENV_PREFIX: &str = "BULWARK_";
pub const DEFAULT_LOG_LEVEL: &str = "info";
