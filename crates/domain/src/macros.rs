//! Label conversions for small domain enums
//!
//! ```rust,ignore
//! use sealgate_domain::impl_label_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum ResourceKind {
//!     Factory,
//!     Session,
//! }
//!
//! impl_label_conversions!(ResourceKind {
//!     Factory => "factory",
//!     Session => "session",
//! });
//! ```

/// Implements `as_str`, `Display` and case-insensitive `FromStr` for an enum
/// whose variants map one-to-one onto lowercase labels.
#[macro_export]
macro_rules! impl_label_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl $enum_name {
            /// Stable lowercase label, suitable for log fields.
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $str,)+
                }
            }
        }

        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}
