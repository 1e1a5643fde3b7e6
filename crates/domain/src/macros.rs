//! String conversions for label enums
//!
//! Several domain enums travel as short lowercase labels: in config files,
//! environment variables and log fields. This macro gives them matching
//! `Display` and case-insensitive `FromStr` implementations from one table.
//!
//! # Example
//!
//! ```rust
//! use bulwark_domain::impl_domain_status_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Lane {
//!     Primary,
//!     Degraded,
//! }
//!
//! impl_domain_status_conversions!(Lane {
//!     Primary => "primary",
//!     Degraded => "degraded",
//! });
//!
//! assert_eq!("DEGRADED".parse::<Lane>(), Ok(Lane::Degraded));
//! assert_eq!(Lane::Primary.to_string(), "primary");
//! ```

/// Implements `Display` and `FromStr` for a label enum
///
/// Parsing lowercases its input before matching, so each label must be
/// written in lowercase. Unknown input yields `"Invalid <Enum>: <input>"`.
#[macro_export]
macro_rules! impl_domain_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => f.write_str($str),)+
                }
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}
